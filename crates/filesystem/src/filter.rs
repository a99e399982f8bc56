//! Include/exclude filtering of collected files.
//!
//! Patterns use glob syntax (`*`, `?`, `[abc]`, `{a,b}`, `**`). A pattern is
//! tested against both the bare file name and the website path, so
//! `*.map` drops every source map while `drafts/**` drops one subtree.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::FileSystemError;

/// Filter deciding which collected files become upload candidates.
#[derive(Debug, Clone, Default)]
pub struct GlobFilter {
    include: Vec<String>,
    exclude: Vec<String>,
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
}

impl GlobFilter {
    /// Create a filter with no patterns (accepts everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter with exclude patterns only.
    ///
    /// # Errors
    /// Returns error if any pattern is invalid.
    pub fn exclude(patterns: Vec<String>) -> Result<Self, FileSystemError> {
        Self::with_patterns(Vec::new(), patterns)
    }

    /// Create a filter with both include and exclude patterns.
    ///
    /// An empty include list accepts every file not excluded.
    ///
    /// # Errors
    /// Returns error if any pattern is invalid.
    pub fn with_patterns(
        include: Vec<String>,
        exclude: Vec<String>,
    ) -> Result<Self, FileSystemError> {
        let include_set: Option<GlobSet> = compile(&include)?;
        let exclude_set: Option<GlobSet> = compile(&exclude)?;
        Ok(Self {
            include,
            exclude,
            include_set,
            exclude_set,
        })
    }

    /// Decide whether a file is kept.
    ///
    /// # Arguments
    /// * `file_name` - Final path component of the local file
    /// * `site_path` - Website path the file would be published under
    pub fn accepts(&self, file_name: &str, site_path: &str) -> bool {
        let hit = |set: &GlobSet| set.is_match(file_name) || set.is_match(site_path);

        let included: bool = self.include_set.as_ref().map_or(true, hit);
        let excluded: bool = self.exclude_set.as_ref().map_or(false, hit);

        included && !excluded
    }

    /// Check if the filter has any patterns.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Get the include patterns.
    pub fn include_patterns(&self) -> &[String] {
        &self.include
    }

    /// Get the exclude patterns.
    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude
    }
}

fn compile(patterns: &[String]) -> Result<Option<GlobSet>, FileSystemError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder: GlobSetBuilder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob: Glob = Glob::new(pattern).map_err(|e| FileSystemError::InvalidGlobPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }

    let set: GlobSet = builder
        .build()
        .map_err(|e| FileSystemError::InvalidGlobPattern {
            pattern: patterns.join(", "),
            reason: e.to_string(),
        })?;
    Ok(Some(set))
}
