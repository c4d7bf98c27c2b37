//! Records stored as one file per version.

use super::{decode, not_found_at, read_file, Listed};
use crate::descriptor::Layout;
use crate::entity::EntityKind;
use crate::error::{CoreError, CoreResult};
use crate::key::{Key, KeyCodec, RecordAddress};
use crate::version::{VersionFile, VersionRecord};
use chrono::Utc;
use recordfs_storage::{StorageBackend, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Which version of a record to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionArgument {
    /// The numerically highest version present.
    #[default]
    Highest,
    /// Exactly this version.
    Specific(u64),
}

impl From<u64> for VersionArgument {
    fn from(version: u64) -> Self {
        Self::Specific(version)
    }
}

/// Access to a kind stored with [`Layout::VersionDirectory`].
///
/// Each instance owns a container directory holding `0<suffix>`,
/// `1<suffix>`, ... The current version is the numerically highest file
/// present, so `10` outranks `9`.
///
/// `put` publishes the next version with a no-clobber write: a file either
/// appears complete under its final name or not at all, and an existing
/// version is never overwritten. Concurrent writers that pick the same number
/// retry with the next one. Prior versions are never touched.
pub struct VersionedResource<R> {
    kind: EntityKind<R>,
    backend: Arc<dyn StorageBackend>,
    put_retries: u32,
}

impl<R> Clone for VersionedResource<R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            backend: Arc::clone(&self.backend),
            put_retries: self.put_retries,
        }
    }
}

impl<R> fmt::Debug for VersionedResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedResource")
            .field("kind", &self.kind)
            .field("put_retries", &self.put_retries)
            .finish_non_exhaustive()
    }
}

impl<R> VersionedResource<R>
where
    R: Serialize + DeserializeOwned,
{
    pub(crate) fn new(
        kind: EntityKind<R>,
        backend: Arc<dyn StorageBackend>,
        put_retries: u32,
    ) -> CoreResult<Self> {
        if kind.descriptor().layout() != Layout::VersionDirectory {
            return Err(CoreError::WrongLayout {
                kind: kind.name().to_string(),
                expected: Layout::VersionDirectory.name(),
            });
        }
        Ok(Self {
            kind,
            backend,
            put_retries,
        })
    }

    /// The kind this resource serves.
    #[must_use]
    pub fn kind(&self) -> &EntityKind<R> {
        &self.kind
    }

    /// Highest version of `key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container is absent or holds no version
    /// files.
    pub fn highest_version(&self, key: &Key) -> CoreResult<u64> {
        let container = self.kind.descriptor().resolver().resolve(key)?;
        self.versions_in(&container)?
            .into_iter()
            .max()
            .ok_or_else(|| CoreError::not_found(container.as_str()))
    }

    /// Current version of `key`.
    ///
    /// # Errors
    ///
    /// Same as [`VersionedResource::get_entity_version`].
    pub fn get_entity(&self, key: &Key) -> CoreResult<VersionRecord<R>> {
        self.get_entity_version(key, VersionArgument::Highest)
    }

    /// One version of `key`.
    ///
    /// # Errors
    ///
    /// - `ArgumentMismatch` if `key` does not fit the template
    /// - `NotFound` if the container, or the requested version, is missing
    /// - `ReadFailure` if the version file cannot be decoded
    pub fn get_entity_version(&self, key: &Key, version: VersionArgument) -> CoreResult<VersionRecord<R>> {
        let version = match version {
            VersionArgument::Highest => self.highest_version(key)?,
            VersionArgument::Specific(version) => version,
        };
        let address = self.kind.descriptor().resolver().resolve_version(key, version)?;
        self.read_version(&address, version)
    }

    /// Every version of `key`, ascending.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the container is absent, or `ReadFailure` if a
    /// version file cannot be decoded.
    pub fn get_all_versions(&self, key: &Key) -> CoreResult<Vec<VersionRecord<R>>> {
        let container = self.kind.descriptor().resolver().resolve(key)?;
        let mut versions = self.versions_in(&container)?;
        versions.sort_unstable();

        let mut records = Vec::with_capacity(versions.len());
        for version in versions {
            let address = self.kind.descriptor().resolver().resolve_version(key, version)?;
            match self.read_version(&address, version) {
                Ok(record) => records.push(record),
                Err(e) if e.is_not_found() => trace!(%address, "version vanished while reading"),
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// The highest version of every instance, sorted by container path.
    ///
    /// Walks only below the kind's static prefix, no deeper than its
    /// containers.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the walk, or `ReadFailure` if a version
    /// file cannot be decoded.
    pub fn list_all(&self) -> CoreResult<Vec<Listed<VersionRecord<R>>>> {
        let descriptor = self.kind.descriptor();
        let plan = descriptor.plan();

        let mut containers = Vec::new();
        for entry in self.backend.walk(plan.static_prefix(), plan.container_depth())? {
            let entry = entry?;
            if entry.is_dir && descriptor.matcher().is_container(&entry.path) {
                containers.push(entry.path);
            }
        }
        containers.sort();
        debug!(kind = descriptor.name(), containers = containers.len(), "listing versioned records");

        let mut listed = Vec::with_capacity(containers.len());
        for container in containers {
            let Some(key) = KeyCodec::key_of_container(descriptor, &container) else {
                continue;
            };
            match self.get_entity(&key) {
                Ok(record) => listed.push(Listed {
                    address: descriptor.resolver().resolve_version(&key, record.version())?,
                    key,
                    value: record,
                }),
                Err(e) if e.is_not_found() => trace!(%container, "skipping empty container"),
                Err(e) => return Err(e),
            }
        }
        Ok(listed)
    }

    /// Writes `record` as the next version of `key`.
    ///
    /// # Errors
    ///
    /// Returns `VersionConflict` if every attempt lost a race for its version
    /// number, or any storage or encoding error.
    pub fn put(&self, key: &Key, record: R) -> CoreResult<VersionRecord<R>> {
        let descriptor = self.kind.descriptor();
        let container = descriptor.resolver().resolve(key)?;
        let attempts = self.put_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let version = match self.highest_version(key) {
                Ok(highest) => highest.checked_add(1).ok_or_else(|| CoreError::VersionConflict {
                    path: container.to_string(),
                    attempts: attempt,
                })?,
                Err(e) if e.is_not_found() => 0,
                Err(e) => return Err(e),
            };
            let address = descriptor.resolver().resolve_version(key, version)?;
            let now = Utc::now();
            let bytes = descriptor.format().encode(&VersionFile {
                version,
                ts: now,
                entity: &record,
            })?;

            match self.backend.write_new(address.as_str(), &bytes) {
                Ok(()) => {
                    debug!(kind = descriptor.name(), %address, version, "version written");
                    return Ok(VersionRecord::new(record, version, now));
                }
                Err(StorageError::AlreadyExists { .. }) => {
                    debug!(kind = descriptor.name(), %address, attempt, "version taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(kind = descriptor.name(), %container, attempts, "giving up on put");
        Err(CoreError::VersionConflict {
            path: container.into_string(),
            attempts,
        })
    }

    /// Writes `record` as the next version of its own key.
    ///
    /// # Errors
    ///
    /// Same as [`VersionedResource::put`].
    pub fn put_record(&self, record: R) -> CoreResult<VersionRecord<R>> {
        let key = self.kind.key_of(&record);
        self.put(&key, record)
    }

    /// Removes exactly one version of `key`.
    ///
    /// Remaining versions keep their numbers. The container is removed once
    /// it is empty.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if that version does not exist.
    pub fn delete(&self, key: &Key, version: u64) -> CoreResult<()> {
        let descriptor = self.kind.descriptor();
        let address = descriptor.resolver().resolve_version(key, version)?;
        if !self.backend.exists(address.as_str())? {
            return Err(CoreError::not_found(address.as_str()));
        }
        self.backend
            .remove(address.as_str())
            .map_err(|e| not_found_at(e, address.as_str()))?;
        debug!(kind = descriptor.name(), %address, "version deleted");

        let container = descriptor.resolver().resolve(key)?;
        match self.backend.list_directory(container.as_str()) {
            Ok(entries) if entries.is_empty() => match self.backend.remove(container.as_str()) {
                Ok(()) => debug!(%container, "empty container removed"),
                Err(e) => trace!(%container, error = %e, "container not removed"),
            },
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Version numbers present in `container`, unordered.
    fn versions_in(&self, container: &RecordAddress) -> CoreResult<Vec<u64>> {
        let entries = self
            .backend
            .list_directory(container.as_str())
            .map_err(|e| not_found_at(e, container.as_str()))?;
        let matcher = self.kind.descriptor().matcher();
        Ok(entries
            .iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| matcher.version_of(&entry.path))
            .collect())
    }

    fn read_version(&self, address: &RecordAddress, version: u64) -> CoreResult<VersionRecord<R>> {
        let format = self.kind.descriptor().format();
        let bytes = read_file(self.backend.as_ref(), address.as_str())?;
        let file: VersionFile<R> = decode(format, &bytes, address.as_str())?;
        if file.version != version {
            warn!(%address, stored = file.version, "version field disagrees with file name");
        }
        trace!(%address, "version read");
        Ok(VersionRecord::new(file.entity, version, file.ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordfs_codec::Format;
    use recordfs_storage::{FileBackend, InMemoryBackend};
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        text: String,
    }

    fn note_kind(format: Format) -> EntityKind<Note> {
        EntityKind::builder("note", "/notes/{id}")
            .uuid("id", |n: &Note| n.id)
            .format(format)
            .layout(Layout::VersionDirectory)
            .build()
            .unwrap()
    }

    fn resource(backend: Arc<dyn StorageBackend>) -> VersionedResource<Note> {
        VersionedResource::new(note_kind(Format::Json), backend, 4).unwrap()
    }

    fn note(id: Uuid, text: &str) -> Note {
        Note {
            id,
            text: text.into(),
        }
    }

    #[test]
    fn rejects_document_kinds() {
        let kind = EntityKind::<Note>::builder("note", "/notes/{id}")
            .uuid("id", |n: &Note| n.id)
            .build()
            .unwrap();
        let err = VersionedResource::new(kind, Arc::new(InMemoryBackend::new()), 1).err().unwrap();
        assert!(matches!(err, CoreError::WrongLayout { .. }));
    }

    #[test]
    fn puts_are_numbered_from_zero() {
        let res = resource(Arc::new(InMemoryBackend::new()));
        let id = Uuid::new_v4();
        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            let written = res.put_record(note(id, text)).unwrap();
            assert_eq!(written.version(), i as u64);
        }
        let key = Key::new().with("id", id);
        let all = res.get_all_versions(&key).unwrap();
        assert_eq!(all.iter().map(VersionRecord::version).collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(res.get_entity(&key).unwrap().into_content().unwrap().text, "c");
        assert_eq!(
            res.get_entity_version(&key, 1.into()).unwrap().into_content().unwrap().text,
            "b"
        );
    }

    #[test]
    fn highest_is_numeric_not_lexicographic() {
        let backend = Arc::new(InMemoryBackend::new());
        let res = resource(backend.clone());
        let id = Uuid::new_v4();
        let key = Key::new().with("id", id);
        for version in [9_u64, 10] {
            let file = VersionFile {
                version,
                ts: Utc::now(),
                entity: note(id, &version.to_string()),
            };
            let address = res.kind().descriptor().resolver().resolve_version(&key, version).unwrap();
            backend
                .write_bytes(address.as_str(), &Format::Json.encode(&file).unwrap())
                .unwrap();
        }
        assert_eq!(res.highest_version(&key).unwrap(), 10);
        let current = res.get_entity(&key).unwrap();
        assert_eq!(current.version(), 10);
        assert_eq!(current.content().unwrap().text, "10");
        assert_eq!(res.put(&key, note(id, "11")).unwrap().version(), 11);
    }

    #[test]
    fn missing_container_is_not_found() {
        let res = resource(Arc::new(InMemoryBackend::new()));
        let key = Key::new().with("id", Uuid::new_v4());
        assert!(res.get_entity(&key).unwrap_err().is_not_found());
        assert!(res.get_all_versions(&key).unwrap_err().is_not_found());
        assert!(res.highest_version(&key).unwrap_err().is_not_found());
    }

    #[test]
    fn empty_container_is_not_found() {
        let backend = Arc::new(InMemoryBackend::new());
        let res = resource(backend.clone());
        let id = Uuid::new_v4();
        backend
            .write_bytes(&format!("/notes/{id}/.0.json.tmp"), b"partial")
            .unwrap();
        let key = Key::new().with("id", id);
        assert!(res.get_entity(&key).unwrap_err().is_not_found());
        assert!(res.get_all_versions(&key).unwrap().is_empty());
    }

    #[test]
    fn missing_specific_version_is_not_found() {
        let res = resource(Arc::new(InMemoryBackend::new()));
        let id = Uuid::new_v4();
        res.put_record(note(id, "a")).unwrap();
        let key = Key::new().with("id", id);
        assert!(res
            .get_entity_version(&key, VersionArgument::Specific(7))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn corrupt_version_is_read_failure() {
        let backend = Arc::new(InMemoryBackend::new());
        let res = resource(backend.clone());
        let id = Uuid::new_v4();
        backend.write_bytes(&format!("/notes/{id}/0.json"), b"{ nope").unwrap();
        let err = res.get_entity(&Key::new().with("id", id)).unwrap_err();
        assert!(err.is_read_failure());
    }

    #[test]
    fn wrong_key_is_argument_mismatch() {
        let res = resource(Arc::new(InMemoryBackend::new()));
        let err = res.get_entity(&Key::new()).unwrap_err();
        assert!(matches!(err, CoreError::ArgumentMismatch { .. }));
    }

    #[test]
    fn list_all_returns_one_per_entity() {
        let res = resource(Arc::new(InMemoryBackend::new()));
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        for text in ["a0", "a1", "a2"] {
            res.put_record(note(a, text)).unwrap();
        }
        res.put_record(note(b, "b0")).unwrap();

        let listed = res.list_all().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key, Key::new().with("id", a));
        assert_eq!(listed[0].value.version(), 2);
        assert_eq!(listed[0].value.content().unwrap().text, "a2");
        assert_eq!(listed[1].value.content().unwrap().text, "b0");
        assert!(listed[0].address.as_str().ends_with("/2.json"));
    }

    #[test]
    fn delete_keeps_other_numbers() {
        let res = resource(Arc::new(InMemoryBackend::new()));
        let id = Uuid::new_v4();
        for text in ["a", "b", "c"] {
            res.put_record(note(id, text)).unwrap();
        }
        let key = Key::new().with("id", id);
        res.delete(&key, 1).unwrap();
        let versions: Vec<_> = res
            .get_all_versions(&key)
            .unwrap()
            .iter()
            .map(VersionRecord::version)
            .collect();
        assert_eq!(versions, [0, 2]);
        assert!(res.delete(&key, 1).unwrap_err().is_not_found());
        assert_eq!(res.put_record(note(id, "d")).unwrap().version(), 3);
    }

    #[test]
    fn delete_last_version_removes_container() {
        let backend = Arc::new(InMemoryBackend::new());
        let res = resource(backend.clone());
        let id = Uuid::new_v4();
        res.put_record(note(id, "a")).unwrap();
        res.delete(&Key::new().with("id", id), 0).unwrap();
        assert!(!backend.exists(&format!("/notes/{id}")).unwrap());
        assert!(res.list_all().unwrap().is_empty());
    }

    #[test]
    fn works_on_disk_with_cbor() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileBackend::open(dir.path()).unwrap());
        let res = VersionedResource::new(note_kind(Format::Cbor), backend, 4).unwrap();
        let id = Uuid::new_v4();
        for i in 0..12 {
            res.put_record(note(id, &format!("v{i}"))).unwrap();
        }
        assert!(dir.path().join(format!("notes/{id}/11.cbor")).exists());
        let current = res.get_entity(&Key::new().with("id", id)).unwrap();
        assert_eq!(current.version(), 11);
        assert_eq!(current.content().unwrap().text, "v11");
    }

    #[test]
    fn concurrent_puts_never_share_a_version() {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn StorageBackend> = Arc::new(FileBackend::open(dir.path()).unwrap());
        let res = VersionedResource::new(note_kind(Format::Json), backend, 64).unwrap();
        let id = Uuid::new_v4();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let res = res.clone();
                std::thread::spawn(move || {
                    (0..5)
                        .map(|i| res.put_record(note(id, &format!("{t}-{i}"))).unwrap().version())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut versions: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (0..20).collect::<Vec<_>>());
    }
}
