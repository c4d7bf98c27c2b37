//! Record-level change notification.

use crate::descriptor::EntityKindDescriptor;
use crate::key::{Key, RecordAddress};
use crate::registry::Registry;
use recordfs_storage::{WatchEvent, WatchEventKind, WatchHandle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// A change to one record, or to the container of a versioned record.
#[derive(Debug, Clone)]
pub struct RecordEvent {
    /// Kind of the affected record.
    pub kind: Arc<EntityKindDescriptor>,
    /// Key decoded from the path.
    pub key: Key,
    /// Version number, for version files.
    pub version: Option<u64>,
    /// What happened.
    pub change: WatchEventKind,
    /// Path of the affected file or container.
    pub address: RecordAddress,
}

impl RecordEvent {
    /// Whether the event concerns a version container rather than a file.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.address.is_directory()
    }
}

/// A scoped stream of [`RecordEvent`]s.
///
/// Raw filesystem events are classified against the kinds registered when
/// the watch was started. Paths that belong to no kind (temporary files,
/// editor backups, sync-tool droppings) are dropped silently. The underlying
/// watch is released when this value is dropped.
pub struct RecordWatch {
    handle: WatchHandle,
    registry: Registry,
    only: Option<String>,
}

impl RecordWatch {
    pub(crate) fn new(handle: WatchHandle, registry: Registry, only: Option<String>) -> Self {
        Self {
            handle,
            registry,
            only,
        }
    }

    /// Waits up to `timeout` for the next record event.
    ///
    /// Returns `None` on timeout or once the source has shut down.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RecordEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.handle.recv_timeout(remaining)?;
            if let Some(event) = self.classify(event) {
                return Some(event);
            }
        }
    }

    /// Returns the next record event if one is already queued.
    pub fn try_recv(&self) -> Option<RecordEvent> {
        while let Some(event) = self.handle.try_recv() {
            if let Some(event) = self.classify(event) {
                return Some(event);
            }
        }
        None
    }

    fn classify(&self, event: WatchEvent) -> Option<RecordEvent> {
        let path = if event.is_dir {
            format!("{}/", event.path)
        } else {
            event.path
        };
        let Some(classified) = self.registry.classify(&path) else {
            trace!(%path, "ignoring unrelated change");
            return None;
        };
        if self
            .only
            .as_deref()
            .is_some_and(|name| name != classified.kind.name())
        {
            return None;
        }
        if classified.container != event.is_dir {
            return None;
        }
        Some(RecordEvent {
            kind: classified.kind,
            key: classified.key,
            version: classified.version,
            change: event.kind,
            address: RecordAddress::new(path),
        })
    }
}

impl Iterator for RecordWatch {
    type Item = RecordEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let event = self.handle.next()?;
            if let Some(event) = self.classify(event) {
                return Some(event);
            }
        }
    }
}

impl std::fmt::Debug for RecordWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordWatch")
            .field("kinds", &self.registry.len())
            .field("only", &self.only)
            .finish_non_exhaustive()
    }
}
