//! Collection of local sources into upload candidates.
//!
//! A source is a file or a directory:
//! - a file is published as `<destination>/<file name>`
//! - every regular file under a directory is published as
//!   `<destination>/<directory name>/<relative path>`
//!
//! Files are read fully into memory. Any unreadable source aborts collection,
//! so a plan is never built from partially-read input.

use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use rusty_sitepush_common::{
    guess_content_type, join_site_path, lexical_normalize, to_posix_path, FileCandidate,
};
use walkdir::WalkDir;

use crate::error::FileSystemError;
use crate::filter::GlobFilter;

/// Options for collecting local files.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Local files or directories to publish.
    pub sources: Vec<PathBuf>,
    /// Website directory to publish under ("" or "/" for the site root).
    pub destination: String,
    /// Include/exclude filter.
    pub filter: GlobFilter,
    /// Follow symlinks while walking directories.
    pub follow_symlinks: bool,
}

impl CollectOptions {
    /// Create options for the given sources, publishing at the site root.
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self {
            sources,
            ..Default::default()
        }
    }

    /// Set the website destination directory.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Set the include/exclude filter.
    pub fn with_filter(mut self, filter: GlobFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Follow symlinks while walking directories.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// A local file paired with the website path it will be published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Local path.
    pub local_path: PathBuf,
    /// Website path.
    pub site_path: String,
}

/// Resolve sources into the list of files to publish, without reading them.
///
/// Directory contents are returned in file-name order so repeated runs see
/// the same sequence.
///
/// # Errors
/// Returns error if a source is missing, is not a file or directory, or if two
/// files map to the same website path.
pub fn list_source_files(options: &CollectOptions) -> Result<Vec<SourceFile>, FileSystemError> {
    let mut files: Vec<SourceFile> = Vec::new();

    for source in &options.sources {
        let metadata: Metadata =
            std::fs::metadata(source).map_err(|e| FileSystemError::SourceUnavailable {
                path: source.display().to_string(),
                message: e.to_string(),
            })?;

        if metadata.is_file() {
            let name: String = file_name(source);
            let site_path: String = join_site_path(&options.destination, &name)?;
            if options.filter.accepts(&name, &site_path) {
                files.push(SourceFile {
                    local_path: source.clone(),
                    site_path,
                });
            }
        } else if metadata.is_dir() {
            walk_directory(source, options, &mut files)?;
        } else {
            return Err(FileSystemError::UnsupportedSource {
                path: source.display().to_string(),
            });
        }
    }

    reject_duplicates(&files)?;
    Ok(files)
}

/// Collect and read every source file into a `FileCandidate`.
///
/// # Errors
/// Returns error on the first source that cannot be resolved or read.
pub fn collect_candidates(options: &CollectOptions) -> Result<Vec<FileCandidate>, FileSystemError> {
    let files: Vec<SourceFile> = list_source_files(options)?;
    let mut candidates: Vec<FileCandidate> = Vec::with_capacity(files.len());

    for file in files {
        let raw_bytes: Vec<u8> = std::fs::read(&file.local_path)
            .map_err(|e| FileSystemError::io(file.local_path.display().to_string(), e))?;
        let content_type: &str = guess_content_type(&file.local_path);

        log::debug!(
            "Collected {} -> {} ({} bytes, {})",
            file.local_path.display(),
            file.site_path,
            raw_bytes.len(),
            content_type
        );

        candidates.push(FileCandidate::new(file.site_path, raw_bytes, content_type));
    }

    Ok(candidates)
}

fn walk_directory(
    root: &Path,
    options: &CollectOptions,
    files: &mut Vec<SourceFile>,
) -> Result<(), FileSystemError> {
    // The directory itself becomes the first component under the destination.
    let base_name: String = file_name(&lexical_normalize(root));

    let walker = WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name();

    for entry in walker {
        let entry: walkdir::DirEntry = entry.map_err(|e| {
            let path: String = e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string());
            FileSystemError::io(path, e.into())
        })?;

        if !entry.file_type().is_file() {
            if entry.file_type().is_symlink() {
                log::warn!("Skipping symlink {}", entry.path().display());
            }
            continue;
        }

        let relative: &Path = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| rusty_sitepush_common::PathError::PathOutsideRoot {
                path: entry.path().display().to_string(),
                root: root.display().to_string(),
            })?;

        let relative_site: String = if base_name.is_empty() {
            to_posix_path(relative)
        } else {
            format!("{}/{}", base_name, to_posix_path(relative))
        };
        let site_path: String = join_site_path(&options.destination, &relative_site)?;
        let name: String = entry.file_name().to_string_lossy().into_owned();

        if options.filter.accepts(&name, &site_path) {
            files.push(SourceFile {
                local_path: entry.into_path(),
                site_path,
            });
        } else {
            log::debug!("Excluded {}", entry.path().display());
        }
    }

    Ok(())
}

fn reject_duplicates(files: &[SourceFile]) -> Result<(), FileSystemError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for file in files {
        if let Some(first) = seen.insert(&file.site_path, &file.local_path) {
            return Err(FileSystemError::DuplicateDestination {
                path: file.site_path.clone(),
                first: first.display().to_string(),
                second: file.local_path.display().to_string(),
            });
        }
    }
    Ok(())
}

/// Final component of a path, or an empty string for roots like `/` or `.`.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
