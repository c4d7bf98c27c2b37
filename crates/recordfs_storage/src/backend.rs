//! Storage backend trait definition.

use crate::error::StorageResult;

/// One entry produced by a directory listing or a recursive walk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    /// Root-relative path of the entry.
    pub path: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl DirEntry {
    /// Creates a file entry.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    /// Creates a directory entry.
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }
}

/// Lazy sequence of entries produced by [`StorageBackend::walk`].
pub type Walk<'a> = Box<dyn Iterator<Item = StorageResult<DirEntry>> + 'a>;

/// A hierarchical byte store rooted at a single directory.
///
/// Backends are **opaque byte stores**. They know nothing about templates,
/// entity kinds or versions; recordfs owns all interpretation of paths and
/// contents.
///
/// # Paths
///
/// All paths are root-relative strings in the form produced by
/// [`crate::path::normalize`]: `/`-separated with a leading `/`.
///
/// # Invariants
///
/// - `read_bytes` returns exactly the bytes last written at that path
/// - `write_bytes` replaces the file atomically: readers observe the old or
///   the new content, never a mix
/// - `write_new` never overwrites an existing file
/// - Backends must be `Send + Sync`; they are shared behind `Arc`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Returns whether a file or directory exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the check fails.
    fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Returns whether a directory exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the check fails.
    fn is_dir(&self, path: &str) -> StorageResult<bool>;

    /// Reads the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no file exists at `path`.
    fn read_bytes(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Writes `data` to `path`, replacing any existing file.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn write_bytes(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Writes `data` to `path` only if nothing exists there yet.
    ///
    /// The file becomes visible complete or not at all.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if `path` is taken.
    fn write_new(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Removes the file at `path`, or the directory at `path` if it is empty.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing exists at `path`, or an I/O error if the
    /// directory is not empty.
    fn remove(&self, path: &str) -> StorageResult<()>;

    /// Lists the direct children of the directory at `path`, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the directory does not exist.
    fn list_directory(&self, path: &str) -> StorageResult<Vec<DirEntry>>;

    /// Walks everything below `root` down to `max_depth` levels.
    ///
    /// Direct children are at depth 1; `root` itself is not yielded. Entries
    /// are yielded in sorted order, parents before children. A missing root
    /// yields nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path is invalid; I/O errors during the
    /// walk surface as items.
    fn walk<'a>(&'a self, root: &str, max_depth: usize) -> StorageResult<Walk<'a>>;

    /// Collects every file below `root` within `max_depth` accepted by
    /// `predicate`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the walk.
    fn find_files(
        &self,
        root: &str,
        max_depth: usize,
        predicate: &dyn Fn(&str) -> bool,
    ) -> StorageResult<Vec<String>> {
        let mut found = Vec::new();
        for entry in self.walk(root, max_depth)? {
            let entry = entry?;
            if !entry.is_dir && predicate(&entry.path) {
                found.push(entry.path);
            }
        }
        Ok(found)
    }
}
