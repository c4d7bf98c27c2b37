//! Directory-rooted storage backend for persistent storage.

use crate::backend::{DirEntry, StorageBackend, Walk};
use crate::error::{StorageError, StorageResult};
use crate::path;
use crate::watch::{PollingWatcher, Snapshot, Snapshotter, Stamp, WatchHandle, WatchSource};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use uuid::Uuid;
use walkdir::WalkDir;

/// Default interval between polls of a watched tree.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A storage backend over a directory of the local filesystem.
///
/// Every root-relative path maps to a file or directory below `root`.
/// Data survives process restarts.
///
/// # Durability
///
/// - `write_bytes` writes a hidden temporary file, syncs it and renames it
///   over the target, then syncs the parent directory
/// - `write_new` publishes the synced temporary file with a hard link, which
///   fails instead of overwriting an existing file
///
/// Temporary files are named `.<name>.<uuid>.tmp` in the target directory.
///
/// # Thread Safety
///
/// This backend holds no mutable state of its own and can be shared across
/// threads. Concurrent writers to the same path are last-write-wins for
/// `write_bytes` and first-write-wins for `write_new`.
///
/// # Example
///
/// ```no_run
/// use recordfs_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open_with_create_dirs(Path::new("data")).unwrap();
/// backend.write_bytes("/widgets/a.json", b"{}").unwrap();
/// assert!(backend.exists("/widgets/a.json").unwrap());
/// ```
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    poll_interval: Duration,
    active_watches: Arc<AtomicUsize>,
}

impl FileBackend {
    /// Opens a backend rooted at an existing directory.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `root` is not an existing directory.
    pub fn open(root: &Path) -> StorageResult<Self> {
        if !root.is_dir() {
            return Err(StorageError::not_found(root.display().to_string()));
        }
        Ok(Self {
            root: root.to_path_buf(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            active_watches: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Opens a backend, creating the root directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open_with_create_dirs(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Self::open(root)
    }

    /// Sets the interval between polls for watches started afterwards.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a root-relative path onto the filesystem.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the path escapes the root.
    pub fn absolute(&self, relative: &str) -> StorageResult<PathBuf> {
        Ok(to_absolute(&self.root, &path::normalize(relative)?))
    }

    fn write_temp(&self, target: &Path) -> StorageResult<(PathBuf, File)> {
        let parent = target
            .parent()
            .ok_or_else(|| StorageError::invalid_path(target.display().to_string(), "no parent"))?;
        fs::create_dir_all(parent)?;
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = parent.join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));
        let file = OpenOptions::new().write(true).create_new(true).open(&temp)?;
        Ok((temp, file))
    }

    fn start_watch(&self, root: &str, max_depth: usize) -> StorageResult<WatchHandle> {
        let normalized = path::normalize(root)?;
        let abs = to_absolute(&self.root, &normalized);
        if !abs.is_dir() {
            return Err(StorageError::not_found(normalized));
        }
        let base = self.root.clone();
        let snapshotter: Snapshotter = Arc::new(move || snapshot_tree(&base, &abs, max_depth));
        PollingWatcher::start(
            normalized,
            self.poll_interval,
            snapshotter,
            Arc::clone(&self.active_watches),
        )
    }
}

fn to_absolute(root: &Path, normalized: &str) -> PathBuf {
    let trimmed = normalized.trim_start_matches('/');
    if trimmed.is_empty() {
        root.to_path_buf()
    } else {
        trimmed.split('/').fold(root.to_path_buf(), |acc, c| acc.join(c))
    }
}

fn to_relative(root: &Path, absolute: &Path) -> Option<String> {
    let rest = absolute.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in rest.components() {
        out.push('/');
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    if out.is_empty() {
        out.push('/');
    }
    Some(out)
}

fn map_not_found(err: io::Error, relative: &str) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::not_found(relative)
    } else {
        StorageError::Io(err)
    }
}

/// Matches the temporary names produced by `write_temp`, which are never
/// reported as changes.
fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".tmp")
}

fn snapshot_tree(root: &Path, start: &Path, max_depth: usize) -> StorageResult<Snapshot> {
    let mut snapshot = Snapshot::new();
    for entry in WalkDir::new(start).min_depth(1).max_depth(max_depth).follow_links(false) {
        let (entry, meta) = match entry.and_then(|e| e.metadata().map(|m| (e, m))) {
            Ok(pair) => pair,
            // entries can vanish between the directory read and the stat
            Err(e) if e.io_error().is_some_and(|io| io.kind() == io::ErrorKind::NotFound) => continue,
            Err(e) => return Err(io::Error::from(e).into()),
        };
        if is_temp_name(&entry.file_name().to_string_lossy()) {
            continue;
        }
        if let Some(relative) = to_relative(root, entry.path()) {
            snapshot.insert(
                relative,
                Stamp {
                    is_dir: meta.is_dir(),
                    len: meta.len(),
                    modified: meta.modified().ok(),
                },
            );
        }
    }
    Ok(snapshot)
}

/// Syncs a directory so renames and links inside it are durable.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> StorageResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StorageResult<()> {
    // NTFS journals metadata; directory handles cannot be synced
    Ok(())
}

impl StorageBackend for FileBackend {
    fn exists(&self, relative: &str) -> StorageResult<bool> {
        Ok(self.absolute(relative)?.exists())
    }

    fn is_dir(&self, relative: &str) -> StorageResult<bool> {
        Ok(self.absolute(relative)?.is_dir())
    }

    fn read_bytes(&self, relative: &str) -> StorageResult<Vec<u8>> {
        let abs = self.absolute(relative)?;
        if abs.is_dir() {
            return Err(StorageError::not_found(relative));
        }
        fs::read(&abs).map_err(|e| map_not_found(e, relative))
    }

    fn write_bytes(&self, relative: &str, data: &[u8]) -> StorageResult<()> {
        let target = self.absolute(relative)?;
        let (temp, mut file) = self.write_temp(&target)?;

        let result = file
            .write_all(data)
            .and_then(|()| file.sync_all())
            .and_then(|()| fs::rename(&temp, &target));
        drop(file);
        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        if let Some(parent) = target.parent() {
            sync_directory(parent)?;
        }
        trace!(path = relative, len = data.len(), "wrote file");
        Ok(())
    }

    fn write_new(&self, relative: &str, data: &[u8]) -> StorageResult<()> {
        let target = self.absolute(relative)?;
        let (temp, mut file) = self.write_temp(&target)?;

        let result = file
            .write_all(data)
            .and_then(|()| file.sync_all())
            .and_then(|()| fs::hard_link(&temp, &target));
        drop(file);
        let _ = fs::remove_file(&temp);

        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::already_exists(relative));
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = target.parent() {
            sync_directory(parent)?;
        }
        trace!(path = relative, len = data.len(), "published new file");
        Ok(())
    }

    fn remove(&self, relative: &str) -> StorageResult<()> {
        let abs = self.absolute(relative)?;
        let result = if abs.is_dir() {
            fs::remove_dir(&abs)
        } else {
            fs::remove_file(&abs)
        };
        result.map_err(|e| map_not_found(e, relative))?;
        if let Some(parent) = abs.parent() {
            sync_directory(parent)?;
        }
        Ok(())
    }

    fn list_directory(&self, relative: &str) -> StorageResult<Vec<DirEntry>> {
        let normalized = path::normalize(relative)?;
        let abs = to_absolute(&self.root, &normalized);
        let read = fs::read_dir(&abs).map_err(|e| map_not_found(e, &normalized))?;

        let mut entries = Vec::new();
        for entry in read {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(DirEntry {
                path: path::join(&normalized, &name),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort();
        Ok(entries)
    }

    fn walk<'a>(&'a self, root: &str, max_depth: usize) -> StorageResult<Walk<'a>> {
        let normalized = path::normalize(root)?;
        let abs = to_absolute(&self.root, &normalized);
        if !abs.is_dir() || max_depth == 0 {
            return Ok(Box::new(std::iter::empty()));
        }

        let iter = WalkDir::new(abs)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => to_relative(&self.root, entry.path()).map(|path| {
                    Ok(DirEntry {
                        path,
                        is_dir: entry.file_type().is_dir(),
                    })
                }),
                Err(e) => Some(Err(StorageError::Io(io::Error::from(e)))),
            });
        Ok(Box::new(iter))
    }
}

impl WatchSource for FileBackend {
    fn watch_recursive(&self, root: &str) -> StorageResult<WatchHandle> {
        self.start_watch(root, usize::MAX)
    }

    fn watch_non_recursive(&self, root: &str) -> StorageResult<WatchHandle> {
        self.start_watch(root, 1)
    }

    fn active_watches(&self) -> usize {
        self.active_watches.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::WatchEventKind;
    use tempfile::tempdir;

    fn backend() -> (tempfile::TempDir, FileBackend) {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path())
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        (dir, backend)
    }

    #[test]
    fn file_open_missing_root_fails() {
        let dir = tempdir().unwrap();
        let result = FileBackend::open(&dir.path().join("missing"));
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("root");
        let backend = FileBackend::open_with_create_dirs(&root).unwrap();
        assert_eq!(backend.root(), root);
        assert!(root.is_dir());
    }

    #[test]
    fn file_write_and_read() {
        let (_dir, backend) = backend();
        backend.write_bytes("/widgets/a.json", b"hello").unwrap();

        assert!(backend.exists("/widgets/a.json").unwrap());
        assert!(backend.is_dir("/widgets").unwrap());
        assert_eq!(backend.read_bytes("/widgets/a.json").unwrap(), b"hello");
    }

    #[test]
    fn file_write_replaces_and_leaves_no_temp() {
        let (dir, backend) = backend();
        backend.write_bytes("/a.json", b"one").unwrap();
        backend.write_bytes("/a.json", b"two").unwrap();

        assert_eq!(backend.read_bytes("/a.json").unwrap(), b"two");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[test]
    fn file_read_missing_is_not_found() {
        let (_dir, backend) = backend();
        let result = backend.read_bytes("/nope.json");
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn file_write_new_refuses_to_clobber() {
        let (_dir, backend) = backend();
        backend.write_new("/v/0.json", b"first").unwrap();

        let result = backend.write_new("/v/0.json", b"second");
        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));
        assert_eq!(backend.read_bytes("/v/0.json").unwrap(), b"first");
        assert_eq!(backend.list_directory("/v").unwrap().len(), 1);
    }

    #[test]
    fn file_remove_file_and_empty_dir() {
        let (_dir, backend) = backend();
        backend.write_bytes("/d/a", b"x").unwrap();

        assert!(backend.remove("/d").is_err());
        backend.remove("/d/a").unwrap();
        backend.remove("/d").unwrap();
        assert!(!backend.exists("/d").unwrap());
        assert!(matches!(
            backend.remove("/d"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn file_list_directory_sorted() {
        let (_dir, backend) = backend();
        backend.write_bytes("/w/b", b"").unwrap();
        backend.write_bytes("/w/a", b"").unwrap();
        backend.write_bytes("/w/c/x", b"").unwrap();

        let entries = backend.list_directory("/w").unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry::file("/w/a"),
                DirEntry::file("/w/b"),
                DirEntry::dir("/w/c"),
            ]
        );
        assert!(matches!(
            backend.list_directory("/missing"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn file_walk_respects_depth() {
        let (_dir, backend) = backend();
        backend.write_bytes("/w/a.json", b"").unwrap();
        backend.write_bytes("/w/x/s/b.json", b"").unwrap();

        let shallow: Vec<_> = backend
            .walk("/w", 1)
            .unwrap()
            .map(|e| e.unwrap().path)
            .collect();
        assert_eq!(shallow, vec!["/w/a.json", "/w/x"]);

        let deep = backend.find_files("/w", 3, &|p| p.ends_with(".json")).unwrap();
        assert_eq!(deep, vec!["/w/a.json", "/w/x/s/b.json"]);

        assert_eq!(backend.walk("/absent", 5).unwrap().count(), 0);
    }

    #[test]
    fn file_rejects_escaping_paths() {
        let (_dir, backend) = backend();
        assert!(matches!(
            backend.read_bytes("/../etc/passwd"),
            Err(StorageError::InvalidPath { .. })
        ));
    }

    #[test]
    fn watch_recursive_reports_nested_creation() {
        let (_dir, backend) = backend();
        let handle = backend.watch_recursive("/").unwrap();

        backend.write_bytes("/a/b", b"b").unwrap();

        let first = handle.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = handle.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, crate::WatchEvent::new(WatchEventKind::Created, "/a", true));
        assert_eq!(second, crate::WatchEvent::new(WatchEventKind::Created, "/a/b", false));
    }

    #[test]
    fn watch_non_recursive_ignores_grandchildren() {
        let (_dir, backend) = backend();
        let handle = backend.watch_non_recursive("/").unwrap();

        backend.write_bytes("/a/b", b"b").unwrap();

        let first = handle.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.path, "/a");
        assert!(handle.recv_timeout(Duration::from_millis(100)).is_none());
    }

    #[test]
    fn watch_missing_root_fails() {
        let (_dir, backend) = backend();
        assert!(backend.watch_recursive("/missing").is_err());
        assert_eq!(backend.active_watches(), 0);
    }

    #[test]
    fn watch_handles_are_released_on_drop() {
        let (_dir, backend) = backend();
        for i in 0..256 {
            let handle = backend.watch_non_recursive("/").unwrap();
            backend.write_bytes(&format!("/{i}"), b"").unwrap();
            assert!(handle.recv_timeout(Duration::from_secs(5)).is_some());
            assert_eq!(backend.active_watches(), 1);
            drop(handle);
        }
        assert_eq!(backend.active_watches(), 0);
    }
}
