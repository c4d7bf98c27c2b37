//! Versioned records: append-only history plus one current snapshot.
//!
//! A [`VersionChain`] is never mutated in place. [`VersionedRecordWriter`]
//! consumes the previous chain and returns the next one;
//! [`VersionedRecordReader`] converts between chains and the
//! [`StoredDocument`] persisted for document kinds with history.

mod chain;
mod reader;
mod stored;
mod writer;

pub use chain::{VersionChain, VersionRecord};
pub use reader::VersionedRecordReader;
pub use stored::{HistoryEntry, StoredDocument, VersionFile, VersionStamp};
pub use writer::VersionedRecordWriter;
