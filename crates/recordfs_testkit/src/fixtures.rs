//! Test fixtures and store helpers.
//!
//! Provides a small sample schema and temporary stores to run it against.
//!
//! | kind | template | layout |
//! |---|---|---|
//! | `widget` | `/widgets/{id}` | document |
//! | `subwidget` | `/widgets/{widgetId}/subwidgets/{id}` | document with history |
//! | `note` | `/widgets/{widgetId}/notes/{id}` | one file per version |

use recordfs_core::{Config, EntityKind, Layout, Store};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

/// A top-level record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    /// Identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

impl Widget {
    /// Creates a widget.
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A record nested below a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subwidget {
    /// Owning widget.
    pub widget_id: Uuid,
    /// Identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

impl Subwidget {
    /// Creates a subwidget.
    pub fn new(widget_id: Uuid, id: Uuid, name: impl Into<String>) -> Self {
        Self {
            widget_id,
            id,
            name: name.into(),
        }
    }
}

/// A versioned record nested below a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Owning widget.
    pub widget_id: Uuid,
    /// Identifier.
    pub id: Uuid,
    /// Note body.
    pub text: String,
}

impl Note {
    /// Creates a note.
    pub fn new(widget_id: Uuid, id: Uuid, text: impl Into<String>) -> Self {
        Self {
            widget_id,
            id,
            text: text.into(),
        }
    }
}

/// The widget used throughout the examples.
pub fn widget_one() -> Uuid {
    Uuid::from_u128(0x1f30d7b6_0296_489a_9615_55868aeef78a)
}

/// The subwidget used throughout the examples.
pub fn subwidget_one() -> Uuid {
    Uuid::from_u128(0x220460be_27d4_4e6d_8ac3_34cf5139b229)
}

/// The `widget` kind.
pub fn widget_kind() -> EntityKind<Widget> {
    EntityKind::builder("widget", "/widgets/{id}")
        .uuid("id", |w: &Widget| w.id)
        .build()
        .expect("widget kind is valid")
}

/// The `subwidget` kind.
pub fn subwidget_kind() -> EntityKind<Subwidget> {
    EntityKind::builder("subwidget", "/widgets/{widgetId}/subwidgets/{id}")
        .uuid("widgetId", |s: &Subwidget| s.widget_id)
        .uuid("id", |s: &Subwidget| s.id)
        .layout(Layout::Document { history: true })
        .build()
        .expect("subwidget kind is valid")
}

/// The `note` kind.
pub fn note_kind() -> EntityKind<Note> {
    EntityKind::builder("note", "/widgets/{widgetId}/notes/{id}")
        .uuid("widgetId", |n: &Note| n.widget_id)
        .uuid("id", |n: &Note| n.id)
        .layout(Layout::VersionDirectory)
        .build()
        .expect("note kind is valid")
}

/// File names that sit next to widget records but belong to no kind.
pub fn noise_names(id: Uuid) -> Vec<String> {
    vec![
        "completelyWrongGarbage".to_string(),
        ".DS_Store".to_string(),
        format!(".syncthing.{id}.json.tmp"),
        format!("{id}.json~"),
        format!("{id}.json.bak"),
        format!("{id}.txt"),
        format!("{id}"),
        format!("{}.json", id.to_string().replacen(|c: char| c.is_ascii_hexdigit(), "g", 1)),
    ]
}

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: Store::in_memory(Config::default()),
            temp_dir: None,
        }
    }

    /// Creates a new store in a temporary directory, polling fast for watches.
    pub fn file() -> Self {
        Self::file_with_config(Config::default().poll_interval(Duration::from_millis(10)))
    }

    /// Creates a new store in a temporary directory with `config`.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Store::open(temp_dir.path(), config).expect("Failed to open file store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the root directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Writes a raw file below the root, creating parent directories.
    ///
    /// Works for both kinds of store; `path` is root-relative.
    pub fn write_raw(&self, path: &str, data: &[u8]) {
        self.store
            .backend()
            .write_bytes(path, data)
            .expect("Failed to write raw file");
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use recordfs_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     assert!(store.kinds().is_empty());
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a store in a temporary directory.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store, &Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A store holding `widgets` widgets, each with `per_widget` subwidgets
    /// and one note.
    pub fn populated_store(widgets: usize, per_widget: usize) -> TestStore {
        let test_store = TestStore::memory();
        let widget_docs = test_store.documents(&widget_kind()).expect("widget resource");
        let subwidget_docs = test_store
            .documents(&subwidget_kind())
            .expect("subwidget resource");
        let notes = test_store.versioned(&note_kind()).expect("note resource");

        for w in 0..widgets {
            let widget_id = Uuid::new_v4();
            widget_docs
                .put_record(Widget::new(widget_id, format!("widget {w}")))
                .expect("Failed to put widget");
            for s in 0..per_widget {
                subwidget_docs
                    .put_record(Subwidget::new(widget_id, Uuid::new_v4(), format!("sub {s}")))
                    .expect("Failed to put subwidget");
            }
            notes
                .put_record(Note::new(widget_id, Uuid::new_v4(), "first"))
                .expect("Failed to put note");
        }

        test_store
    }
}
