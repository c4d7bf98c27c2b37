//! Schema files and key arguments.
//!
//! A schema file lists the entity kinds of a store:
//!
//! ```json
//! {
//!   "kinds": [
//!     {
//!       "name": "widget",
//!       "template": "/widgets/{id}",
//!       "properties": [{ "name": "id", "kind": "uuid" }]
//!     },
//!     {
//!       "name": "note",
//!       "template": "/notes/{id}",
//!       "properties": [{ "name": "id", "kind": "uuid" }],
//!       "format": "cbor",
//!       "layout": { "type": "version_directory" }
//!     }
//!   ]
//! }
//! ```

use recordfs_core::{
    Config, CoreError, DefinitionError, EntityKind, Format, Key, Layout, PropertyDecl,
    PropertyKind, Store,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while loading a schema or parsing arguments.
#[derive(Debug, Error)]
pub enum CliError {
    /// The schema file could not be read.
    #[error("cannot read schema {path}: {source}")]
    SchemaRead {
        /// Schema file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The schema file is not valid.
    #[error("invalid schema {path}: {source}")]
    SchemaParse {
        /// Schema file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A kind in the schema failed validation.
    #[error("kind {name}: {source}")]
    Kind {
        /// Kind name.
        name: String,
        /// Underlying error.
        source: DefinitionError,
    },

    /// A `name=uuid` argument could not be parsed.
    #[error("invalid key argument '{0}', expected name=uuid")]
    KeyArgument(String),

    /// No kind has the requested name.
    #[error("no kind named '{0}' in schema")]
    UnknownKind(String),

    /// A required option was not given.
    #[error("{0} required")]
    Missing(&'static str),

    /// A store operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// A schema file.
#[derive(Debug, Deserialize)]
pub struct SchemaFile {
    /// Declared kinds.
    pub kinds: Vec<KindDef>,
}

/// One declared kind.
#[derive(Debug, Deserialize)]
pub struct KindDef {
    /// Kind name.
    pub name: String,
    /// Address template.
    pub template: String,
    /// Declared properties.
    #[serde(default)]
    pub properties: Vec<PropertyDecl>,
    /// Record format; the configured default when absent.
    #[serde(default)]
    pub format: Option<Format>,
    /// Storage layout.
    #[serde(default)]
    pub layout: Layout,
}

impl SchemaFile {
    /// Reads and parses a schema file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::SchemaRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::SchemaParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds every kind as an untyped JSON record kind.
    pub fn build(&self, config: &Config) -> CliResult<Vec<EntityKind<Value>>> {
        self.kinds.iter().map(|def| def.build(config)).collect()
    }
}

impl KindDef {
    /// Builds the kind, reading key properties from the record's fields.
    pub fn build(&self, config: &Config) -> CliResult<EntityKind<Value>> {
        let mut builder = EntityKind::builder(self.name.clone(), self.template.clone())
            .format(self.format.unwrap_or(config.default_format))
            .layout(self.layout);
        for property in &self.properties {
            builder = match property.kind {
                PropertyKind::Uuid => {
                    let field = property.name.clone();
                    builder.uuid(property.name.clone(), move |record: &Value| uuid_field(record, &field))
                }
                kind => builder.property(property.name.clone(), kind),
            };
        }
        builder.build().map_err(|source| CliError::Kind {
            name: self.name.clone(),
            source,
        })
    }
}

/// Reads a UUID field, or the nil UUID when it is missing or malformed.
fn uuid_field(record: &Value, field: &str) -> Uuid {
    record
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::nil)
}

/// Loads the schema at `path` and registers its kinds with a store.
pub fn open_store(schema: &Path, root: Option<&Path>) -> CliResult<(Store, Vec<EntityKind<Value>>)> {
    let config = Config::default().create_if_missing(false);
    let kinds = SchemaFile::load(schema)?.build(&config)?;
    let store = match root {
        Some(root) => Store::open(root, config)?,
        None => Store::in_memory(config),
    };
    for kind in &kinds {
        store.register(std::sync::Arc::clone(kind.descriptor()))?;
    }
    Ok((store, kinds))
}

/// Finds a kind by name.
pub fn find_kind<'k>(kinds: &'k [EntityKind<Value>], name: &str) -> CliResult<&'k EntityKind<Value>> {
    kinds
        .iter()
        .find(|kind| kind.name() == name)
        .ok_or_else(|| CliError::UnknownKind(name.to_string()))
}

/// Parses `name=uuid` arguments into a key.
pub fn parse_key(args: &[String]) -> CliResult<Key> {
    args.iter()
        .map(|arg| {
            let (name, value) = arg
                .split_once('=')
                .ok_or_else(|| CliError::KeyArgument(arg.clone()))?;
            let value = Uuid::parse_str(value).map_err(|_| CliError::KeyArgument(arg.clone()))?;
            Ok((name.to_string(), value))
        })
        .collect()
}
