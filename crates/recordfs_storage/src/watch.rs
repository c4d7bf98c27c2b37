//! Filesystem change notification.
//!
//! A [`WatchSource`] hands out [`WatchHandle`]s: scoped resources that yield
//! [`WatchEvent`]s until dropped. Dropping a handle always releases whatever
//! backs it (a polling thread, a subscriber slot), whether the consumer
//! finished normally, stopped early or bailed out on an error.
//!
//! ```rust,ignore
//! let handle = backend.watch_recursive("/widgets")?;
//! for event in handle.take(3) {
//!     println!("{:?} {}", event.kind, event.path);
//! }
//! // handle dropped here: the watch is released
//! ```

use crate::error::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, trace, warn};

/// Type of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// A file or directory appeared.
    Created,
    /// A file's content changed.
    Modified,
    /// A file or directory disappeared.
    Deleted,
}

/// A single filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub kind: WatchEventKind,
    /// Root-relative path of the affected entry.
    pub path: String,
    /// Whether the affected entry is a directory.
    pub is_dir: bool,
}

impl WatchEvent {
    /// Creates an event.
    pub fn new(kind: WatchEventKind, path: impl Into<String>, is_dir: bool) -> Self {
        Self {
            kind,
            path: path.into(),
            is_dir,
        }
    }
}

/// Something that can be watched for changes.
pub trait WatchSource {
    /// Watches `root` and everything below it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `root` is not an existing directory, or `Watch`
    /// if the watch cannot be established.
    fn watch_recursive(&self, root: &str) -> StorageResult<WatchHandle>;

    /// Watches the direct children of `root` only.
    ///
    /// # Errors
    ///
    /// Same as [`WatchSource::watch_recursive`].
    fn watch_non_recursive(&self, root: &str) -> StorageResult<WatchHandle>;

    /// Number of handles acquired from this source and not yet released.
    fn active_watches(&self) -> usize;
}

/// Releases a watch exactly once, when dropped.
struct ReleaseGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// An active watch.
///
/// Yields events through [`Iterator`] (blocking), [`WatchHandle::recv_timeout`]
/// or [`WatchHandle::try_recv`]. The sequence is unbounded and cannot be
/// restarted. The underlying resource is released when the handle is dropped.
pub struct WatchHandle {
    events: Receiver<WatchEvent>,
    _guard: ReleaseGuard,
}

impl WatchHandle {
    /// Wraps an event receiver together with the action that releases it.
    pub fn new(events: Receiver<WatchEvent>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            events,
            _guard: ReleaseGuard {
                release: Some(Box::new(release)),
            },
        }
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout or once the source has shut down.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WatchEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&self) -> Option<WatchEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Iterator for WatchHandle {
    type Item = WatchEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.events.recv().ok()
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish_non_exhaustive()
    }
}

/// Per-entry state compared between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stamp {
    pub(crate) is_dir: bool,
    pub(crate) len: u64,
    pub(crate) modified: Option<SystemTime>,
}

/// A point-in-time view of a watched tree.
pub(crate) type Snapshot = BTreeMap<String, Stamp>;

/// Produces a fresh snapshot; shared with the polling thread.
pub(crate) type Snapshotter = Arc<dyn Fn() -> StorageResult<Snapshot> + Send + Sync>;

/// Computes the events that turn `old` into `new`.
///
/// Creations come parents first, deletions children first. Directory
/// timestamps are ignored: a directory only produces created and deleted
/// events.
pub(crate) fn diff(old: &Snapshot, new: &Snapshot) -> Vec<WatchEvent> {
    let mut events = Vec::new();
    for (path, stamp) in new {
        match old.get(path) {
            None => events.push(WatchEvent::new(WatchEventKind::Created, path, stamp.is_dir)),
            Some(prev) if !stamp.is_dir && prev != stamp => {
                events.push(WatchEvent::new(WatchEventKind::Modified, path, false));
            }
            Some(_) => {}
        }
    }
    for (path, stamp) in old.iter().rev() {
        if !new.contains_key(path) {
            events.push(WatchEvent::new(WatchEventKind::Deleted, path, stamp.is_dir));
        }
    }
    events
}

/// Watches a tree by periodically diffing snapshots on a background thread.
///
/// The first snapshot is taken before [`PollingWatcher::start`] returns, so
/// every change made after that call is reported. Changes that revert within
/// one interval, or rewrite a file with identical size inside the timestamp
/// granularity, can go unnoticed.
pub(crate) struct PollingWatcher;

impl PollingWatcher {
    /// Starts polling and returns the scoped handle.
    pub(crate) fn start(
        label: String,
        interval: Duration,
        snapshotter: Snapshotter,
        active: Arc<AtomicUsize>,
    ) -> StorageResult<WatchHandle> {
        let initial = snapshotter()?;
        let (event_tx, event_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread_label = label.clone();
        let worker: JoinHandle<()> = std::thread::Builder::new()
            .name("recordfs-watch".into())
            .spawn(move || poll_loop(&thread_label, interval, &snapshotter, initial, &event_tx, &stop_rx))
            .map_err(|e| StorageError::Watch(format!("failed to spawn watch thread: {e}")))?;

        active.fetch_add(1, Ordering::SeqCst);
        debug!(watch = %label, ?interval, "watch started");

        Ok(WatchHandle::new(event_rx, move || {
            drop(stop_tx);
            if worker.join().is_err() {
                warn!(watch = %label, "watch thread panicked");
            }
            active.fetch_sub(1, Ordering::SeqCst);
            debug!(watch = %label, "watch released");
        }))
    }
}

fn poll_loop(
    label: &str,
    interval: Duration,
    snapshotter: &Snapshotter,
    mut current: Snapshot,
    events: &Sender<WatchEvent>,
    stop: &Receiver<()>,
) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        let next = match snapshotter() {
            Ok(next) => next,
            Err(e) if e.is_not_found() => Snapshot::new(),
            Err(e) => {
                warn!(watch = %label, error = %e, "snapshot failed, retrying next interval");
                continue;
            }
        };

        for event in diff(&current, &next) {
            trace!(watch = %label, kind = ?event.kind, path = %event.path, "change");
            if events.send(event).is_err() {
                return;
            }
        }
        current = next;
    }
}
