//! History command implementation.

use crate::schema::{find_kind, open_store, parse_key};
use recordfs_core::{Layout, VersionRecord};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// One version of a record.
#[derive(Debug, Serialize)]
pub struct HistoryLine {
    /// Version number.
    pub version: u64,
    /// Write time, RFC 3339.
    pub ts: String,
    /// Record content, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Value>,
}

/// Runs the history command.
///
/// Lists the versions of a record, oldest first.
pub fn run(
    schema: &Path,
    root: &Path,
    kind: &str,
    key: &[String],
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (store, kinds) = open_store(schema, Some(root))?;
    let kind = find_kind(&kinds, kind)?;
    let key = parse_key(key)?;

    let records: Vec<VersionRecord<Value>> = match kind.descriptor().layout() {
        Layout::Document { .. } => {
            let (mut history, current) = store.documents(kind)?.get_chain(&key)?.into_parts();
            history.push(current);
            history
        }
        Layout::VersionDirectory => store.versioned(kind)?.get_all_versions(&key)?,
    };

    let with_content = format == "json";
    let lines = records
        .into_iter()
        .map(|record| {
            let version = record.version();
            let ts = record.timestamp().to_rfc3339();
            let entity = if with_content {
                Some(record.into_content()?)
            } else {
                None
            };
            Ok(HistoryLine { version, ts, entity })
        })
        .collect::<Result<Vec<_>, recordfs_core::CoreError>>()?;

    if with_content {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else {
        for line in &lines {
            println!("{:>6}  {}", line.version, line.ts);
        }
    }
    Ok(())
}
