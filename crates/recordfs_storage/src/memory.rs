//! In-memory storage backend for testing.

use crate::backend::{DirEntry, StorageBackend, Walk};
use crate::error::{StorageError, StorageResult};
use crate::path;
use crate::watch::{WatchEvent, WatchEventKind, WatchHandle, WatchSource};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl Tree {
    fn is_dir(&self, path: &str) -> bool {
        path == "/" || self.dirs.contains(path)
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = path::join(dir, "");
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(p, _)| p.starts_with(&prefix))
            || self
                .dirs
                .range(prefix.clone()..)
                .next()
                .is_some_and(|p| p.starts_with(&prefix))
    }

    /// Creates missing ancestors of `file`, returning the ones created.
    fn create_ancestors(&mut self, file: &str) -> Vec<String> {
        let mut missing = Vec::new();
        let mut current = path::parent(file);
        while let Some(dir) = current {
            if self.is_dir(dir) {
                break;
            }
            missing.push(dir.to_string());
            current = path::parent(dir);
        }
        missing.reverse();
        for dir in &missing {
            self.dirs.insert(dir.clone());
        }
        missing
    }

    /// Entries strictly below `root` and at most `max_depth` levels deep.
    ///
    /// Only the key range under `root` is scanned.
    fn entries_below(&self, root: &str, max_depth: usize) -> Vec<DirEntry> {
        let prefix = path::join(root, "");
        let within = |p: &String| path::depth_below(root, p).is_some_and(|d| d <= max_depth);
        let dirs = self
            .dirs
            .range(prefix.clone()..)
            .take_while(|p| p.starts_with(&prefix))
            .filter(|p| within(p))
            .map(|p| DirEntry::dir(p.clone()));
        let files = self
            .files
            .range(prefix.clone()..)
            .map(|(p, _)| p)
            .take_while(|p| p.starts_with(&prefix))
            .filter(|p| within(p))
            .map(|p| DirEntry::file(p.clone()));
        let mut entries: Vec<DirEntry> = dirs.chain(files).collect();
        entries.sort();
        entries
    }
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    root: String,
    recursive: bool,
    tx: Sender<WatchEvent>,
}

impl Subscriber {
    fn wants(&self, event_path: &str) -> bool {
        match path::depth_below(&self.root, event_path) {
            Some(1) => true,
            Some(_) => self.recursive,
            None => false,
        }
    }
}

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    list: Vec<Subscriber>,
}

/// An in-memory storage backend.
///
/// This backend keeps the whole tree in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// Directories exist implicitly: writing a file creates its ancestors, and
/// an empty directory stays until removed. Watches are push-based; every
/// mutation is delivered to matching subscribers before the call returns.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use recordfs_storage::{StorageBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.write_bytes("/widgets/a.json", b"{}").unwrap();
/// assert_eq!(backend.read_bytes("/widgets/a.json").unwrap(), b"{}");
/// assert!(backend.is_dir("/widgets").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tree: RwLock<Tree>,
    subscribers: Arc<RwLock<Subscribers>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of files stored.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.tree.read().files.len()
    }

    /// Clears all files and directories. Watches stay registered.
    pub fn clear(&self) {
        let mut tree = self.tree.write();
        tree.files.clear();
        tree.dirs.clear();
    }

    fn emit(&self, events: Vec<WatchEvent>) {
        if events.is_empty() {
            return;
        }
        let mut subscribers = self.subscribers.write();
        subscribers.list.retain(|sub| {
            events
                .iter()
                .filter(|e| sub.wants(&e.path))
                .all(|e| sub.tx.send(e.clone()).is_ok())
        });
    }

    fn subscribe(&self, root: &str, recursive: bool) -> StorageResult<WatchHandle> {
        let root = path::normalize(root)?;
        if !self.tree.read().is_dir(&root) {
            return Err(StorageError::not_found(root));
        }

        let (tx, rx) = mpsc::channel();
        let id = {
            let mut subscribers = self.subscribers.write();
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.list.push(Subscriber {
                id,
                root,
                recursive,
                tx,
            });
            id
        };

        let subscribers = Arc::clone(&self.subscribers);
        Ok(WatchHandle::new(rx, move || {
            subscribers.write().list.retain(|sub| sub.id != id);
        }))
    }

    fn write_file(&self, relative: &str, data: &[u8], clobber: bool) -> StorageResult<()> {
        let normalized = path::normalize(relative)?;
        let events = {
            let mut tree = self.tree.write();
            if tree.is_dir(&normalized) {
                return Err(StorageError::invalid_path(normalized, "is a directory"));
            }
            let mut ancestor = path::parent(&normalized);
            while let Some(dir) = ancestor {
                if tree.files.contains_key(dir) {
                    return Err(StorageError::invalid_path(normalized.as_str(), "ancestor is a file"));
                }
                ancestor = path::parent(dir);
            }
            let existed = tree.files.contains_key(&normalized);
            if existed && !clobber {
                return Err(StorageError::already_exists(normalized));
            }

            let mut events: Vec<WatchEvent> = tree
                .create_ancestors(&normalized)
                .into_iter()
                .map(|dir| WatchEvent::new(WatchEventKind::Created, dir, true))
                .collect();
            tree.files.insert(normalized.clone(), data.to_vec());
            let kind = if existed {
                WatchEventKind::Modified
            } else {
                WatchEventKind::Created
            };
            events.push(WatchEvent::new(kind, normalized, false));
            events
        };
        self.emit(events);
        Ok(())
    }
}

impl StorageBackend for InMemoryBackend {
    fn exists(&self, relative: &str) -> StorageResult<bool> {
        let normalized = path::normalize(relative)?;
        let tree = self.tree.read();
        Ok(tree.files.contains_key(&normalized) || tree.is_dir(&normalized))
    }

    fn is_dir(&self, relative: &str) -> StorageResult<bool> {
        let normalized = path::normalize(relative)?;
        Ok(self.tree.read().is_dir(&normalized))
    }

    fn read_bytes(&self, relative: &str) -> StorageResult<Vec<u8>> {
        let normalized = path::normalize(relative)?;
        self.tree
            .read()
            .files
            .get(&normalized)
            .cloned()
            .ok_or_else(|| StorageError::not_found(normalized))
    }

    fn write_bytes(&self, relative: &str, data: &[u8]) -> StorageResult<()> {
        self.write_file(relative, data, true)
    }

    fn write_new(&self, relative: &str, data: &[u8]) -> StorageResult<()> {
        self.write_file(relative, data, false)
    }

    fn remove(&self, relative: &str) -> StorageResult<()> {
        let normalized = path::normalize(relative)?;
        let event = {
            let mut tree = self.tree.write();
            if tree.files.remove(&normalized).is_some() {
                WatchEvent::new(WatchEventKind::Deleted, normalized, false)
            } else if tree.dirs.contains(&normalized) {
                if tree.has_children(&normalized) {
                    return Err(StorageError::Io(std::io::Error::other(format!(
                        "directory not empty: {normalized}"
                    ))));
                }
                tree.dirs.remove(&normalized);
                WatchEvent::new(WatchEventKind::Deleted, normalized, true)
            } else {
                return Err(StorageError::not_found(normalized));
            }
        };
        self.emit(vec![event]);
        Ok(())
    }

    fn list_directory(&self, relative: &str) -> StorageResult<Vec<DirEntry>> {
        let normalized = path::normalize(relative)?;
        let tree = self.tree.read();
        if !tree.is_dir(&normalized) {
            return Err(StorageError::not_found(normalized));
        }
        Ok(tree.entries_below(&normalized, 1))
    }

    fn walk<'a>(&'a self, root: &str, max_depth: usize) -> StorageResult<Walk<'a>> {
        let normalized = path::normalize(root)?;
        let entries = self.tree.read().entries_below(&normalized, max_depth);
        Ok(Box::new(entries.into_iter().map(Ok)))
    }
}

impl WatchSource for InMemoryBackend {
    fn watch_recursive(&self, root: &str) -> StorageResult<WatchHandle> {
        self.subscribe(root, true)
    }

    fn watch_non_recursive(&self, root: &str) -> StorageResult<WatchHandle> {
        self.subscribe(root, false)
    }

    fn active_watches(&self) -> usize {
        self.subscribers.read().list.len()
    }
}
