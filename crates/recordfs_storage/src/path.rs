//! Root-relative path helpers.
//!
//! Every path crossing the storage boundary is a `/`-separated string that
//! starts with `/` and is interpreted relative to the backend root, e.g.
//! `/widgets/1f30d7b6-0296-489a-9615-55868aeef78a.json`. These helpers keep
//! that form canonical so backends and the core agree on string identity.

use crate::error::{StorageError, StorageResult};

/// Normalizes a root-relative path.
///
/// Adds a missing leading `/`, drops a trailing `/` (except for the root
/// itself) and rejects `.`/`..` components, empty components and backslashes.
///
/// # Errors
///
/// Returns `InvalidPath` if the path cannot be expressed relative to the root.
pub fn normalize(path: &str) -> StorageResult<String> {
    if path.contains('\\') {
        return Err(StorageError::invalid_path(path, "backslash separator"));
    }
    let trimmed = path.trim_start_matches('/');
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }

    let mut out = String::with_capacity(trimmed.len() + 1);
    for component in trimmed.split('/') {
        match component {
            "" => return Err(StorageError::invalid_path(path, "empty component")),
            "." | ".." => return Err(StorageError::invalid_path(path, "relative component")),
            _ => {
                out.push('/');
                out.push_str(component);
            }
        }
    }
    Ok(out)
}

/// Joins a child name onto a normalized directory path.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{}/{name}", dir.trim_end_matches('/'))
    }
}

/// Returns the parent directory of a normalized path, or `None` for the root.
#[must_use]
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Returns the last component of a normalized path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Number of components between `root` and `path`, or `None` if `path` is not
/// strictly below `root`.
#[must_use]
pub fn depth_below(root: &str, path: &str) -> Option<usize> {
    let rest = if root == "/" {
        path.strip_prefix('/')?
    } else {
        path.strip_prefix(root)?.strip_prefix('/')?
    };
    if rest.is_empty() {
        None
    } else {
        Some(rest.split('/').count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_leading_slash_and_drops_trailing() {
        assert_eq!(normalize("widgets/a.json").unwrap(), "/widgets/a.json");
        assert_eq!(normalize("/widgets/").unwrap(), "/widgets");
        assert_eq!(normalize("").unwrap(), "/");
        assert_eq!(normalize("/").unwrap(), "/");
    }

    #[test]
    fn normalize_rejects_escapes() {
        assert!(normalize("/widgets/../etc").is_err());
        assert!(normalize("/widgets/./a").is_err());
        assert!(normalize("/widgets//a").is_err());
        assert!(normalize("\\widgets").is_err());
    }

    #[test]
    fn join_and_parent() {
        assert_eq!(join("/", "widgets"), "/widgets");
        assert_eq!(join("/widgets", "a.json"), "/widgets/a.json");
        assert_eq!(parent("/widgets/a.json"), Some("/widgets"));
        assert_eq!(parent("/widgets"), Some("/"));
        assert_eq!(parent("/"), None);
        assert_eq!(file_name("/widgets/a.json"), "a.json");
    }

    #[test]
    fn depth_below_counts_components() {
        assert_eq!(depth_below("/widgets", "/widgets/a.json"), Some(1));
        assert_eq!(depth_below("/widgets", "/widgets/a/b"), Some(2));
        assert_eq!(depth_below("/", "/widgets"), Some(1));
        assert_eq!(depth_below("/widgets", "/widgets"), None);
        assert_eq!(depth_below("/widgets", "/widgetsx/a"), None);
    }
}
