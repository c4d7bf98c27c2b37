//! Converting between chains and stored documents.

use super::chain::{VersionChain, VersionRecord};
use super::stored::{HistoryEntry, StoredDocument, VersionStamp};
use crate::error::{CoreError, CoreResult};
use recordfs_codec::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Reads and writes the persisted form of a [`VersionChain`].
pub struct VersionedRecordReader;

impl VersionedRecordReader {
    /// Turns a stored document into a chain.
    ///
    /// The current snapshot is decoded immediately; historic snapshots keep
    /// their raw trees until their content is requested. A document with no
    /// stamp reads as version 0 written at the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns `ReadFailure` if the current fields do not fit `T` or the
    /// version numbers are not sequential.
    pub fn read<T: DeserializeOwned>(document: StoredDocument) -> CoreResult<VersionChain<T>> {
        let StoredDocument {
            content,
            history,
            current_version,
        } = document;
        let current_version = current_version.unwrap_or(VersionStamp::UNSTAMPED);

        let current: T = serde_json::from_value(Value::Object(content)).map_err(|e| {
            CoreError::read_failure_caused_by(
                format!("cannot decode current version {}", current_version.version),
                e,
            )
        })?;

        let history = history
            .into_iter()
            .map(|entry| VersionRecord::from_raw(entry.entity, entry.version, entry.ts))
            .collect();

        VersionChain::new(
            history,
            VersionRecord::new(current, current_version.version, current_version.ts),
        )
    }

    /// Turns a chain into its stored document.
    ///
    /// Historic snapshots that were never materialized are written back from
    /// their raw trees untouched.
    ///
    /// # Errors
    ///
    /// Returns `Codec(EncodingFailed)` if the current content does not
    /// serialize to an object, or `ReadFailure` if a snapshot has no content
    /// at all.
    pub fn store<T: Serialize>(chain: &VersionChain<T>) -> CoreResult<StoredDocument> {
        let current = chain.current();
        let content = match snapshot_value(current)? {
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(CodecError::encoding_failed(
                    "records with history must serialize to an object",
                )
                .into())
            }
            None => return Err(CoreError::read_failure("missing raw content")),
        };

        let history = chain
            .history()
            .iter()
            .map(|record| {
                Ok(HistoryEntry {
                    version: record.version(),
                    ts: record.timestamp(),
                    entity: snapshot_value(record)?,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(StoredDocument {
            content,
            history,
            current_version: Some(VersionStamp {
                version: current.version(),
                ts: current.timestamp(),
            }),
        })
    }
}

fn snapshot_value<T: Serialize>(record: &VersionRecord<T>) -> CoreResult<Option<Value>> {
    match record.materialized() {
        Some(content) => serde_json::to_value(content)
            .map(Some)
            .map_err(|e| CodecError::encoding_failed(e.to_string()).into()),
        None => Ok(record.raw().cloned()),
    }
}
