//! Path normalization utilities for website paths.
//!
//! Website paths are POSIX-style, relative to the site root and carry no
//! leading or trailing slash: `index.html`, `assets/logo.png`.

use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// Lexical path normalization without filesystem access.
///
/// Removes `.` components and resolves `..` components lexically.
/// Does not access the filesystem or resolve symlinks.
///
/// # Arguments
/// * `path` - Path to normalize
///
/// # Returns
/// Normalized path with `.` and `..` resolved lexically.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !components.is_empty()
                    && !matches!(
                        components.last(),
                        Some(Component::ParentDir) | Some(Component::RootDir)
                    )
                {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Convert a path to POSIX-style string (forward slashes).
///
/// # Arguments
/// * `path` - Path to convert
///
/// # Returns
/// String with forward slashes as separators.
pub fn to_posix_path(path: &Path) -> String {
    path.components()
        .map(|c: Component| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize a user-supplied website path.
///
/// Backslashes are treated as separators, empty and `.` segments are dropped
/// and `..` is resolved. A path that climbs above the site root is rejected,
/// as is a path that normalizes to nothing.
///
/// # Arguments
/// * `path` - Raw website path, e.g. `/assets//./logo.png`
///
/// # Errors
/// Returns `PathError::InvalidPath` for empty or escaping paths.
pub fn normalize_site_path(path: &str) -> Result<String, PathError> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::invalid(path, "escapes the site root"));
                }
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(PathError::invalid(path, "empty path"));
    }

    Ok(segments.join("/"))
}

/// Join a destination prefix and a relative path into a website path.
///
/// An empty prefix (or `/`) places the file at the site root.
///
/// # Errors
/// Returns error if the joined path is not a valid site path.
pub fn join_site_path(prefix: &str, relative: &str) -> Result<String, PathError> {
    let trimmed: &str = prefix.trim_matches('/');
    if trimmed.is_empty() {
        normalize_site_path(relative)
    } else {
        normalize_site_path(&format!("{}/{}", trimmed, relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_normalize() {
        assert_eq!(
            lexical_normalize(Path::new("/site/./dist/../public/index.html")),
            PathBuf::from("/site/public/index.html")
        );
        assert_eq!(lexical_normalize(Path::new("../a")), PathBuf::from("../a"));
    }

    #[test]
    fn test_to_posix_path() {
        let path: PathBuf = ["assets", "img", "logo.png"].iter().collect();
        assert_eq!(to_posix_path(&path), "assets/img/logo.png");
    }

    #[test]
    fn test_normalize_site_path_strips_slashes() {
        assert_eq!(normalize_site_path("/index.html").unwrap(), "index.html");
        assert_eq!(
            normalize_site_path("assets//./css/site.css/").unwrap(),
            "assets/css/site.css"
        );
        assert_eq!(
            normalize_site_path("assets\\js\\app.js").unwrap(),
            "assets/js/app.js"
        );
    }

    #[test]
    fn test_normalize_site_path_parent_dirs() {
        assert_eq!(normalize_site_path("a/b/../c.txt").unwrap(), "a/c.txt");
        assert!(matches!(
            normalize_site_path("../secret"),
            Err(PathError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_normalize_site_path_empty() {
        assert!(normalize_site_path("").is_err());
        assert!(normalize_site_path("/").is_err());
        assert!(normalize_site_path("./.").is_err());
    }

    #[test]
    fn test_join_site_path() {
        assert_eq!(join_site_path("", "index.html").unwrap(), "index.html");
        assert_eq!(join_site_path("/", "index.html").unwrap(), "index.html");
        assert_eq!(
            join_site_path("/blog/", "dist/post.html").unwrap(),
            "blog/dist/post.html"
        );
    }
}
