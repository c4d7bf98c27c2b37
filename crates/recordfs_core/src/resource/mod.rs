//! Typed access to the records of one entity kind.
//!
//! [`DocumentResource`] serves kinds with [`crate::Layout::Document`];
//! [`VersionedResource`] serves kinds with
//! [`crate::Layout::VersionDirectory`]. Both are cheap handles obtained from
//! [`crate::Store`] and can be cloned freely.

mod document;
mod versioned;

pub use document::DocumentResource;
pub use versioned::{VersionArgument, VersionedResource};

use crate::error::{CoreError, CoreResult};
use crate::key::{Key, RecordAddress};
use recordfs_codec::Format;
use recordfs_storage::{StorageBackend, StorageError};
use serde::de::DeserializeOwned;

/// One result of a listing.
#[derive(Debug, Clone)]
pub struct Listed<T> {
    /// Key decoded from the path.
    pub key: Key,
    /// Where the value was read from.
    pub address: RecordAddress,
    /// The value.
    pub value: T,
}

/// Reads a file, reporting a missing one as `NotFound` for `address`.
fn read_file(backend: &dyn StorageBackend, address: &str) -> CoreResult<Vec<u8>> {
    backend.read_bytes(address).map_err(|e| not_found_at(e, address))
}

/// Maps any storage-level "missing" error to `NotFound` for `address`.
fn not_found_at(err: StorageError, address: &str) -> CoreError {
    if err.is_not_found() {
        CoreError::not_found(address)
    } else {
        err.into()
    }
}

/// Decodes stored bytes, reporting failures as `ReadFailure`.
fn decode<T: DeserializeOwned>(format: Format, bytes: &[u8], address: &str) -> CoreResult<T> {
    format
        .decode(bytes)
        .map_err(|e| CoreError::read_failure_caused_by(format!("cannot decode {address}"), e))
}
