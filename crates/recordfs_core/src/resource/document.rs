//! Records stored as one document per instance.

use super::{decode, not_found_at, read_file, Listed};
use crate::descriptor::Layout;
use crate::entity::EntityKind;
use crate::error::{CoreError, CoreResult};
use crate::key::{Key, KeyCodec, RecordAddress};
use crate::version::{StoredDocument, VersionChain, VersionedRecordReader, VersionedRecordWriter};
use recordfs_storage::StorageBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Access to a kind stored with [`Layout::Document`].
///
/// Writes replace the document atomically: readers see the old or the new
/// file, never a mix. There is no cross-writer coordination; when two
/// writers race on one document the last rename wins, and for kinds with
/// history the loser's snapshot is not recorded.
pub struct DocumentResource<R> {
    kind: EntityKind<R>,
    backend: Arc<dyn StorageBackend>,
    history: bool,
}

impl<R> Clone for DocumentResource<R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            backend: Arc::clone(&self.backend),
            history: self.history,
        }
    }
}

impl<R> fmt::Debug for DocumentResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentResource")
            .field("kind", &self.kind)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl<R> DocumentResource<R>
where
    R: Serialize + DeserializeOwned,
{
    pub(crate) fn new(kind: EntityKind<R>, backend: Arc<dyn StorageBackend>) -> CoreResult<Self> {
        let Layout::Document { history } = kind.descriptor().layout() else {
            return Err(CoreError::WrongLayout {
                kind: kind.name().to_string(),
                expected: Layout::default().name(),
            });
        };
        Ok(Self {
            kind,
            backend,
            history,
        })
    }

    /// The kind this resource serves.
    #[must_use]
    pub fn kind(&self) -> &EntityKind<R> {
        &self.kind
    }

    /// The record stored for `key`.
    ///
    /// # Errors
    ///
    /// - `ArgumentMismatch` if `key` does not fit the template
    /// - `NotFound` if there is no such document
    /// - `ReadFailure` if the document cannot be decoded
    pub fn get(&self, key: &Key) -> CoreResult<R> {
        let address = self.kind.descriptor().resolver().resolve(key)?;
        self.read(&address)
    }

    /// The full version chain stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns `WrongLayout` if the kind keeps no history, otherwise the same
    /// errors as [`DocumentResource::get`].
    pub fn get_chain(&self, key: &Key) -> CoreResult<VersionChain<R>> {
        self.require_history()?;
        let address = self.kind.descriptor().resolver().resolve(key)?;
        self.read_chain(&address)
    }

    /// Stores `record` under `key`, returning its address.
    ///
    /// For kinds with history the previous document, if any, becomes the
    /// newest history entry.
    ///
    /// # Errors
    ///
    /// Returns `ArgumentMismatch` for a bad key, `ReadFailure` if the
    /// existing chain cannot be read, or any storage or encoding error.
    pub fn put(&self, key: &Key, record: R) -> CoreResult<RecordAddress> {
        let descriptor = self.kind.descriptor();
        let address = descriptor.resolver().resolve(key)?;

        let bytes = if self.history {
            let old = match self.read_chain(&address) {
                Ok(chain) => Some(chain),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };
            let chain = VersionedRecordWriter::write(old, record);
            debug!(kind = descriptor.name(), %address, version = chain.version(), "writing document version");
            descriptor.format().encode(&VersionedRecordReader::store(&chain)?)?
        } else {
            descriptor.format().encode(&record)?
        };

        self.backend.write_bytes(address.as_str(), &bytes)?;
        debug!(kind = descriptor.name(), %address, "document written");
        Ok(address)
    }

    /// Stores `record` under its own key.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentResource::put`].
    pub fn put_record(&self, record: R) -> CoreResult<RecordAddress> {
        let key = self.kind.key_of(&record);
        self.put(&key, record)
    }

    /// Removes the document for `key`, history included.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such document.
    pub fn delete(&self, key: &Key) -> CoreResult<()> {
        let address = self.kind.descriptor().resolver().resolve(key)?;
        if !self.backend.exists(address.as_str())? {
            return Err(CoreError::not_found(address.as_str()));
        }
        self.backend
            .remove(address.as_str())
            .map_err(|e| not_found_at(e, address.as_str()))?;
        debug!(kind = self.kind.name(), %address, "document deleted");
        Ok(())
    }

    /// Every record of the kind, sorted by path.
    ///
    /// Walks only below the kind's static prefix, no deeper than its record
    /// files, skipping anything the matcher rejects.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the walk, or `ReadFailure` if a matching
    /// document cannot be decoded.
    pub fn list_all(&self) -> CoreResult<Vec<Listed<R>>> {
        let descriptor = self.kind.descriptor();
        let plan = descriptor.plan();
        let matcher = descriptor.matcher();
        let mut paths = self.backend.find_files(
            plan.static_prefix(),
            plan.record_depth(descriptor.layout()),
            &|path| matcher.is_record(path),
        )?;
        paths.sort();
        debug!(kind = descriptor.name(), records = paths.len(), "listing documents");
        self.read_all(paths)
    }

    /// Records directly below the listing prefix of `parent`, sorted by path.
    ///
    /// `parent` supplies the listing template's variables; pass an empty key
    /// for a top-level kind. A missing directory yields no records.
    ///
    /// # Errors
    ///
    /// Returns `ArgumentMismatch` if `parent` does not fit the listing
    /// template, otherwise the same errors as [`DocumentResource::list_all`].
    pub fn list_children(&self, parent: &Key) -> CoreResult<Vec<Listed<R>>> {
        let descriptor = self.kind.descriptor();
        let prefix = descriptor.resolver().resolve_listing_prefix(parent)?;
        let entries = match self.backend.list_directory(prefix.as_str()) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let paths = entries
            .into_iter()
            .filter(|entry| !entry.is_dir && descriptor.matcher().is_record(&entry.path))
            .map(|entry| entry.path)
            .collect();
        self.read_all(paths)
    }

    fn read_all(&self, paths: Vec<String>) -> CoreResult<Vec<Listed<R>>> {
        let descriptor = self.kind.descriptor();
        let mut listed = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(key) = KeyCodec::key_of_path(descriptor, &path) else {
                continue;
            };
            let address = RecordAddress::new(path);
            match self.read(&address) {
                Ok(value) => listed.push(Listed { key, address, value }),
                Err(e) if e.is_not_found() => trace!(%address, "document vanished while listing"),
                Err(e) => return Err(e),
            }
        }
        Ok(listed)
    }

    fn read(&self, address: &RecordAddress) -> CoreResult<R> {
        if self.history {
            return self.read_chain(address)?.into_parts().1.into_content();
        }
        let bytes = read_file(self.backend.as_ref(), address.as_str())?;
        trace!(%address, "document read");
        decode(self.kind.descriptor().format(), &bytes, address.as_str())
    }

    fn read_chain(&self, address: &RecordAddress) -> CoreResult<VersionChain<R>> {
        let bytes = read_file(self.backend.as_ref(), address.as_str())?;
        let document: StoredDocument = decode(self.kind.descriptor().format(), &bytes, address.as_str())?;
        trace!(%address, history = document.history.len(), "document chain read");
        VersionedRecordReader::read(document)
    }

    fn require_history(&self) -> CoreResult<()> {
        if self.history {
            Ok(())
        } else {
            Err(CoreError::WrongLayout {
                kind: self.kind.name().to_string(),
                expected: "document with history",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordfs_codec::Format;
    use recordfs_storage::{FileBackend, InMemoryBackend};
    use serde::Deserialize;
    use serde_json::json;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: Uuid,
        name: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Subwidget {
        id: Uuid,
        widget_id: Uuid,
        name: String,
    }

    fn widget_one() -> Uuid {
        Uuid::parse_str("1f30d7b6-0296-489a-9615-55868aeef78a").unwrap()
    }

    fn widget_kind(history: bool) -> EntityKind<Widget> {
        EntityKind::builder("widget", "/widgets/{id}")
            .uuid("id", |w: &Widget| w.id)
            .layout(Layout::Document { history })
            .build()
            .unwrap()
    }

    fn subwidget_kind() -> EntityKind<Subwidget> {
        EntityKind::builder("subwidget", "/widgets/{widgetId}/subwidgets/{id}")
            .uuid("widgetId", |s: &Subwidget| s.widget_id)
            .uuid("id", |s: &Subwidget| s.id)
            .build()
            .unwrap()
    }

    fn widget(id: Uuid, name: &str) -> Widget {
        Widget {
            id,
            name: name.into(),
        }
    }

    #[test]
    fn put_then_get() {
        let backend = Arc::new(InMemoryBackend::new());
        let res = DocumentResource::new(widget_kind(false), backend.clone()).unwrap();
        let address = res.put_record(widget(widget_one(), "gear")).unwrap();
        assert_eq!(address.as_str(), "/widgets/1f30d7b6-0296-489a-9615-55868aeef78a.json");

        let key = Key::new().with("id", widget_one());
        assert_eq!(res.get(&key).unwrap(), widget(widget_one(), "gear"));

        res.put(&key, widget(widget_one(), "cog")).unwrap();
        assert_eq!(res.get(&key).unwrap().name, "cog");
        assert_eq!(backend.file_count(), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let res = DocumentResource::new(widget_kind(false), Arc::new(InMemoryBackend::new())).unwrap();
        let err = res.get(&Key::new().with("id", Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn corrupt_document_is_read_failure() {
        let backend = Arc::new(InMemoryBackend::new());
        let res = DocumentResource::new(widget_kind(false), backend.clone()).unwrap();
        backend
            .write_bytes("/widgets/1f30d7b6-0296-489a-9615-55868aeef78a.json", b"[1, 2")
            .unwrap();
        let err = res.get(&Key::new().with("id", widget_one())).unwrap_err();
        assert!(err.is_read_failure());
    }

    #[test]
    fn history_kinds_append_snapshots() {
        let backend = Arc::new(InMemoryBackend::new());
        let res = DocumentResource::new(widget_kind(true), backend.clone()).unwrap();
        for name in ["a", "b", "c", "d"] {
            res.put_record(widget(widget_one(), name)).unwrap();
        }
        let key = Key::new().with("id", widget_one());
        let chain = res.get_chain(&key).unwrap();
        assert_eq!(chain.version(), 3);
        let names: Vec<_> = chain
            .history()
            .iter()
            .map(|r| r.content().unwrap().name.clone())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(res.get(&key).unwrap().name, "d");

        let raw: serde_json::Value = Format::Json
            .decode(&backend.read_bytes("/widgets/1f30d7b6-0296-489a-9615-55868aeef78a.json").unwrap())
            .unwrap();
        assert_eq!(raw["name"], json!("d"));
        assert_eq!(raw["currentVersion"]["version"], json!(3));
        assert_eq!(raw["history"][0]["entity"]["name"], json!("a"));
    }

    #[test]
    fn history_put_over_unstamped_document() {
        let backend = Arc::new(InMemoryBackend::new());
        let plain = DocumentResource::new(widget_kind(false), backend.clone()).unwrap();
        plain.put_record(widget(widget_one(), "plain")).unwrap();

        let res = DocumentResource::new(widget_kind(true), backend).unwrap();
        res.put_record(widget(widget_one(), "stamped")).unwrap();

        let chain = res.get_chain(&Key::new().with("id", widget_one())).unwrap();
        assert_eq!(chain.version(), 1);
        assert_eq!(chain.history()[0].version(), 0);
        assert_eq!(chain.history()[0].timestamp(), chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
        assert_eq!(chain.history()[0].content().unwrap().name, "plain");
        assert_eq!(chain.current().content().unwrap().name, "stamped");
    }

    #[test]
    fn chain_requires_history() {
        let res = DocumentResource::new(widget_kind(false), Arc::new(InMemoryBackend::new())).unwrap();
        let err = res.get_chain(&Key::new().with("id", widget_one())).unwrap_err();
        assert!(matches!(err, CoreError::WrongLayout { .. }));
    }

    #[test]
    fn delete_removes_document() {
        let res = DocumentResource::new(widget_kind(false), Arc::new(InMemoryBackend::new())).unwrap();
        res.put_record(widget(widget_one(), "gear")).unwrap();
        let key = Key::new().with("id", widget_one());
        res.delete(&key).unwrap();
        assert!(res.get(&key).unwrap_err().is_not_found());
        assert!(res.delete(&key).unwrap_err().is_not_found());
    }

    #[test]
    fn list_all_skips_noise_and_other_kinds() {
        let backend = Arc::new(InMemoryBackend::new());
        let widgets = DocumentResource::new(widget_kind(false), backend.clone()).unwrap();
        let subwidgets = DocumentResource::new(subwidget_kind(), backend.clone()).unwrap();

        let w1 = Uuid::from_u128(1);
        let w2 = Uuid::from_u128(2);
        widgets.put_record(widget(w2, "two")).unwrap();
        widgets.put_record(widget(w1, "one")).unwrap();
        subwidgets
            .put_record(Subwidget {
                id: Uuid::from_u128(3),
                widget_id: w1,
                name: "child".into(),
            })
            .unwrap();
        backend.write_bytes("/widgets/completelyWrongGarbage", b"x").unwrap();
        backend
            .write_bytes(&format!("/widgets/.syncthing.{w1}.json.tmp"), b"x")
            .unwrap();

        let listed = widgets.list_all().unwrap();
        assert_eq!(
            listed.iter().map(|l| l.value.name.as_str()).collect::<Vec<_>>(),
            ["one", "two"]
        );

        let children = subwidgets.list_all().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].key.get("widgetId"), Some(w1));
    }

    #[test]
    fn list_children_of_parent() {
        let backend = Arc::new(InMemoryBackend::new());
        let subwidgets = DocumentResource::new(subwidget_kind(), backend).unwrap();
        let parent = Uuid::from_u128(1);
        let other = Uuid::from_u128(2);
        for (widget_id, n) in [(parent, 10), (parent, 11), (other, 12)] {
            subwidgets
                .put_record(Subwidget {
                    id: Uuid::from_u128(n),
                    widget_id,
                    name: n.to_string(),
                })
                .unwrap();
        }

        let children = subwidgets.list_children(&Key::new().with("widgetId", parent)).unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.value.widget_id == parent));

        let none = subwidgets
            .list_children(&Key::new().with("widgetId", Uuid::from_u128(9)))
            .unwrap();
        assert!(none.is_empty());

        assert!(matches!(
            subwidgets.list_children(&Key::new()),
            Err(CoreError::ArgumentMismatch { .. })
        ));
    }

    #[test]
    fn on_disk_layout() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FileBackend::open(dir.path()).unwrap());
        let subwidgets = DocumentResource::new(subwidget_kind(), backend).unwrap();
        let record = Subwidget {
            id: Uuid::parse_str("220460be-27d4-4e6d-8ac3-34cf5139b229").unwrap(),
            widget_id: widget_one(),
            name: "child".into(),
        };
        subwidgets.put_record(record.clone()).unwrap();
        assert!(dir
            .path()
            .join("widgets/1f30d7b6-0296-489a-9615-55868aeef78a/subwidgets/220460be-27d4-4e6d-8ac3-34cf5139b229.json")
            .is_file());
        assert_eq!(subwidgets.list_all().unwrap()[0].value, record);
    }

    #[test]
    fn versioned_kinds_are_rejected() {
        let kind = EntityKind::<Widget>::builder("widget", "/widgets/{id}")
            .uuid("id", |w: &Widget| w.id)
            .layout(Layout::VersionDirectory)
            .build()
            .unwrap();
        let err = DocumentResource::new(kind, Arc::new(InMemoryBackend::new())).unwrap_err();
        assert!(matches!(err, CoreError::WrongLayout { .. }));
    }

    #[test]
    fn debug_names_the_kind() {
        let res = DocumentResource::new(widget_kind(true), Arc::new(InMemoryBackend::new())).unwrap();
        let text = format!("{res:?}");
        assert!(text.starts_with("DocumentResource"));
        assert!(text.contains("/widgets/{id}"));
        assert!(text.contains("history: true"));
    }
}
