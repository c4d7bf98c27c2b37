//! List command implementation.

use crate::schema::{find_kind, open_store, parse_key};
use recordfs_core::{Key, Layout, Listed};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

/// One listed record.
#[derive(Debug, Serialize)]
pub struct ListedRecord {
    /// Where the record lives.
    pub address: String,
    /// Key decoded from the address.
    pub key: Map<String, Value>,
    /// Current version, for versioned kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Record content (JSON output only).
    pub value: Value,
}

/// Converts a key to a JSON object.
pub fn key_json(key: &Key) -> Map<String, Value> {
    key.iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect()
}

/// Runs the list command.
///
/// Lists every record of a kind, or with `parent` only the records directly
/// below that parent.
pub fn run(
    schema: &Path,
    root: &Path,
    kind: &str,
    parent: Option<&[String]>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (store, kinds) = open_store(schema, Some(root))?;
    let kind = find_kind(&kinds, kind)?;

    let records: Vec<ListedRecord> = match kind.descriptor().layout() {
        Layout::Document { .. } => {
            let documents = store.documents(kind)?;
            let listed = match parent {
                Some(parent) => documents.list_children(&parse_key(parent)?)?,
                None => documents.list_all()?,
            };
            listed.into_iter().map(|l| record(l, None)).collect()
        }
        Layout::VersionDirectory => {
            if parent.is_some() {
                return Err("--parent is only supported for document kinds".into());
            }
            let mut records = Vec::new();
            for listed in store.versioned(kind)?.list_all()? {
                let version = listed.value.version();
                let Listed { key, address, value } = listed;
                let value = value.into_content()?;
                records.push(record(Listed { key, address, value }, Some(version)));
            }
            records
        }
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => {
            for record in &records {
                match record.version {
                    Some(version) => println!("{} (version {version})", record.address),
                    None => println!("{}", record.address),
                }
            }
            println!("{} record(s)", records.len());
        }
    }
    Ok(())
}

fn record(listed: Listed<Value>, version: Option<u64>) -> ListedRecord {
    ListedRecord {
        address: listed.address.into_string(),
        key: key_json(&listed.key),
        version,
        value: listed.value,
    }
}
