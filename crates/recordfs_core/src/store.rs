//! Store facade.

use crate::config::Config;
use crate::descriptor::EntityKindDescriptor;
use crate::entity::EntityKind;
use crate::error::{CoreError, CoreResult, DefinitionError};
use crate::registry::{Classified, Registry};
use crate::resource::{DocumentResource, VersionedResource};
use crate::watch::RecordWatch;
use parking_lot::RwLock;
use recordfs_storage::{path, FileBackend, InMemoryBackend, StorageBackend, WatchSource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// The main store handle.
///
/// A `Store` owns the registry of entity kinds and the storage they live in.
/// It hands out typed resources per kind and record-level watch streams.
///
/// # Opening a Store
///
/// ```rust,no_run
/// use recordfs_core::{Config, EntityKind, Key, Store};
/// use serde::{Deserialize, Serialize};
/// use std::path::Path;
/// use uuid::Uuid;
///
/// #[derive(Serialize, Deserialize)]
/// struct Widget {
///     id: Uuid,
///     name: String,
/// }
///
/// let store = Store::open(Path::new("data"), Config::default())?;
/// let widgets = EntityKind::builder("widget", "/widgets/{id}")
///     .uuid("id", |w: &Widget| w.id)
///     .build()?;
///
/// let docs = store.documents(&widgets)?;
/// let id = Uuid::new_v4();
/// docs.put_record(Widget { id, name: "gear".into() })?;
/// let back = docs.get(&Key::new().with("id", id))?;
/// assert_eq!(back.name, "gear");
/// # Ok::<(), recordfs_core::CoreError>(())
/// ```
///
/// # In-Memory Stores
///
/// For testing, use `Store::in_memory()`:
///
/// ```rust
/// let store = recordfs_core::Store::in_memory(recordfs_core::Config::default());
/// assert!(store.kinds().is_empty());
/// ```
pub struct Store {
    config: Config,
    registry: RwLock<Registry>,
    backend: Arc<dyn StorageBackend>,
    watcher: Arc<dyn WatchSource + Send + Sync>,
}

impl Store {
    /// Opens a store rooted at a directory.
    ///
    /// The directory is created when missing unless `create_if_missing` is
    /// false.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the root cannot be opened or created.
    pub fn open(root: &Path, config: Config) -> CoreResult<Self> {
        let backend = if config.create_if_missing {
            FileBackend::open_with_create_dirs(root)?
        } else {
            FileBackend::open(root)?
        };
        let backend = backend.with_poll_interval(config.poll_interval);
        info!(root = %root.display(), "opened store");
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// Creates a store whose records live only in memory.
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self::with_backend(Arc::new(InMemoryBackend::new()), config)
    }

    /// Creates a store over any backend that can also be watched.
    pub fn with_backend<B>(backend: Arc<B>, config: Config) -> Self
    where
        B: StorageBackend + WatchSource + 'static,
    {
        let watcher: Arc<dyn WatchSource + Send + Sync> = backend.clone();
        Self {
            config,
            registry: RwLock::new(Registry::new()),
            backend,
            watcher,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the storage backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Number of watches currently held on the backend.
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.watcher.active_watches()
    }

    /// Registers a kind.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKind` if another kind already uses the name.
    pub fn register(&self, descriptor: Arc<EntityKindDescriptor>) -> CoreResult<()> {
        debug!(kind = descriptor.name(), template = %descriptor.template(), "registering kind");
        self.registry.write().register(descriptor)?;
        Ok(())
    }

    /// Looks up a registered kind.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if no kind has that name.
    pub fn kind(&self, name: &str) -> CoreResult<Arc<EntityKindDescriptor>> {
        self.registry
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::unknown_kind(name))
    }

    /// All registered kinds, sorted by name.
    #[must_use]
    pub fn kinds(&self) -> Vec<Arc<EntityKindDescriptor>> {
        self.registry.read().kinds().cloned().collect()
    }

    /// Identifies which record, if any, `path` belongs to.
    #[must_use]
    pub fn classify(&self, path: &str) -> Option<Classified> {
        self.registry.read().classify(path)
    }

    /// Document access for `kind`, registering it on first use.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKind` if a kind with a different definition is
    /// registered under the same name, or `WrongLayout` if the kind is stored
    /// one file per version.
    pub fn documents<R>(&self, kind: &EntityKind<R>) -> CoreResult<DocumentResource<R>>
    where
        R: Serialize + DeserializeOwned,
    {
        self.ensure_registered(kind.descriptor())?;
        DocumentResource::new(kind.clone(), Arc::clone(&self.backend))
    }

    /// Version directory access for `kind`, registering it on first use.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKind` if a kind with a different definition is
    /// registered under the same name, or `WrongLayout` if the kind is stored
    /// as documents.
    pub fn versioned<R>(&self, kind: &EntityKind<R>) -> CoreResult<VersionedResource<R>>
    where
        R: Serialize + DeserializeOwned,
    {
        self.ensure_registered(kind.descriptor())?;
        VersionedResource::new(kind.clone(), Arc::clone(&self.backend), self.config.put_retries)
    }

    /// Watches every registered kind.
    ///
    /// Kinds registered after the watch starts are not reported by it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the watch cannot be established.
    pub fn watch(&self) -> CoreResult<RecordWatch> {
        let registry = self.registry.read().clone();
        let handle = self.watcher.watch_recursive("/")?;
        debug!(kinds = registry.len(), "watching store");
        Ok(RecordWatch::new(handle, registry, None))
    }

    /// Watches the records of one kind.
    ///
    /// The watch covers the kind's static prefix, or its nearest existing
    /// ancestor when the prefix has not been created yet.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` for an unregistered name, or a storage error if
    /// the watch cannot be established.
    pub fn watch_kind(&self, name: &str) -> CoreResult<RecordWatch> {
        let registry = self.registry.read().clone();
        let kind = registry.get(name).ok_or_else(|| CoreError::unknown_kind(name))?;
        let prefix = path::normalize(kind.plan().static_prefix())?;

        let mut root = prefix.as_str();
        while !self.backend.is_dir(root)? {
            match path::parent(root) {
                Some(parent) => root = parent,
                None => break,
            }
        }
        let handle = self.watcher.watch_recursive(root)?;
        debug!(kind = name, %root, "watching kind");
        Ok(RecordWatch::new(handle, registry, Some(name.to_string())))
    }

    fn ensure_registered(&self, descriptor: &Arc<EntityKindDescriptor>) -> CoreResult<()> {
        let mut registry = self.registry.write();
        match registry.get(descriptor.name()) {
            Some(existing) if existing.same_definition(descriptor) => Ok(()),
            Some(_) => Err(DefinitionError::DuplicateKind {
                name: descriptor.name().to_string(),
            }
            .into()),
            None => {
                debug!(kind = descriptor.name(), "registering kind on first use");
                registry.register(Arc::clone(descriptor))?;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .field("kinds", &self.registry.read().len())
            .finish_non_exhaustive()
    }
}
