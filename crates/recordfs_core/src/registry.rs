//! The set of entity kinds known to a store.

use crate::descriptor::{EntityKindDescriptor, Layout};
use crate::error::DefinitionError;
use crate::key::{Key, KeyCodec};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What a discovered path turned out to be.
#[derive(Debug, Clone)]
pub struct Classified {
    /// The kind the path belongs to.
    pub kind: Arc<EntityKindDescriptor>,
    /// The decoded key.
    pub key: Key,
    /// The version number, for version files.
    pub version: Option<u64>,
    /// Whether the path is a version container rather than a record file.
    pub container: bool,
}

/// Registered entity kinds, by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    kinds: BTreeMap<String, Arc<EntityKindDescriptor>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a kind.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKind` if the name is taken.
    pub fn register(&mut self, descriptor: Arc<EntityKindDescriptor>) -> Result<(), DefinitionError> {
        let name = descriptor.name().to_string();
        if self.kinds.contains_key(&name) {
            return Err(DefinitionError::DuplicateKind { name });
        }
        self.kinds.insert(name, descriptor);
        Ok(())
    }

    /// Looks up a kind by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<EntityKindDescriptor>> {
        self.kinds.get(name)
    }

    /// All kinds, sorted by name.
    pub fn kinds(&self) -> impl Iterator<Item = &Arc<EntityKindDescriptor>> {
        self.kinds.values()
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no kinds are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Identifies the kind and key of `path`.
    ///
    /// Returns `None` for noise and for paths claimed by more than one kind.
    /// Record files win over version containers.
    #[must_use]
    pub fn classify(&self, path: &str) -> Option<Classified> {
        let records: Vec<_> = self
            .kinds
            .values()
            .filter(|kind| kind.matcher().is_record(path))
            .collect();
        if let [kind] = records.as_slice() {
            let kind = *kind;
            let key = KeyCodec::key_of_path(kind, path)?;
            let version = match kind.layout() {
                Layout::VersionDirectory => Some(kind.matcher().version_of(path)?),
                Layout::Document { .. } => None,
            };
            return Some(Classified {
                kind: Arc::clone(kind),
                key,
                version,
                container: false,
            });
        }
        if !records.is_empty() {
            return None;
        }

        let containers: Vec<_> = self
            .kinds
            .values()
            .filter(|kind| kind.matcher().is_container(path))
            .collect();
        match containers.as_slice() {
            [kind] => Some(Classified {
                kind: Arc::clone(*kind),
                key: KeyCodec::key_of_container(kind, path)?,
                version: None,
                container: true,
            }),
            _ => None,
        }
    }
}
