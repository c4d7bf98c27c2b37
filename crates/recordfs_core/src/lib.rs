//! # recordfs Core
//!
//! Maps typed records onto a directory tree.
//!
//! This crate provides:
//! - Path templates that describe where each kind of record lives
//! - Matching of arbitrary paths back to records, rejecting filesystem noise
//! - Address resolution from keys to paths and listing prefixes
//! - Version chains, stored either inside one document or one file per version
//! - Typed resources for get, list, put and delete
//! - Record-level watch streams
//!
//! ## Example
//!
//! ```rust
//! use recordfs_core::{EntityKindDescriptor, Key, Layout, PropertyDecl};
//! use recordfs_codec::Format;
//! use uuid::Uuid;
//!
//! let kind = EntityKindDescriptor::new(
//!     "subwidget",
//!     "/widgets/{widgetId}/subwidgets/{id}",
//!     vec![PropertyDecl::uuid("widgetId"), PropertyDecl::uuid("id")],
//!     Format::Json,
//!     Layout::default(),
//! )
//! .unwrap();
//!
//! let widget = Uuid::parse_str("1f30d7b6-0296-489a-9615-55868aeef78a").unwrap();
//! let id = Uuid::parse_str("220460be-27d4-4e6d-8ac3-34cf5139b229").unwrap();
//! let key = Key::new().with("widgetId", widget).with("id", id);
//!
//! let address = kind.resolver().resolve(&key).unwrap();
//! assert_eq!(
//!     address.as_str(),
//!     "/widgets/1f30d7b6-0296-489a-9615-55868aeef78a/subwidgets/220460be-27d4-4e6d-8ac3-34cf5139b229.json"
//! );
//! assert!(kind.matcher().is_record(address.as_str()));
//! assert!(!kind.matcher().is_record("/widgets/.DS_Store"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod descriptor;
mod entity;
mod error;
mod key;
mod listing;
mod matcher;
mod registry;
mod resolver;
mod resource;
mod schema;
mod store;
mod version;
mod watch;

pub use config::Config;
pub use descriptor::{EntityKindDescriptor, Layout};
pub use entity::{Accessor, EntityKind, EntityKindBuilder};
pub use error::{CoreError, CoreResult, DefinitionError};
pub use key::{Key, KeyCodec, RecordAddress};
pub use listing::ListingPlan;
pub use matcher::PatternMatcher;
pub use registry::{Classified, Registry};
pub use resolver::AddressResolver;
pub use resource::{DocumentResource, Listed, VersionArgument, VersionedResource};
pub use schema::{PathTemplate, PropertyDecl, PropertyKind, Segment};
pub use store::Store;
pub use version::{
    HistoryEntry, StoredDocument, VersionChain, VersionFile, VersionRecord, VersionStamp,
    VersionedRecordReader, VersionedRecordWriter,
};
pub use watch::{RecordEvent, RecordWatch};

pub use recordfs_codec::Format;
pub use recordfs_storage::WatchEventKind;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
