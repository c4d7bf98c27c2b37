//! Get command implementation.

use crate::schema::{find_kind, open_store, parse_key};
use recordfs_core::{Layout, VersionArgument};
use std::path::Path;

/// Runs the get command.
///
/// Prints the record with the given key as pretty JSON. `version` selects a
/// specific version of a versioned kind; the highest is read otherwise.
pub fn run(
    schema: &Path,
    root: &Path,
    kind: &str,
    key: &[String],
    version: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (store, kinds) = open_store(schema, Some(root))?;
    let kind = find_kind(&kinds, kind)?;
    let key = parse_key(key)?;

    let value = match kind.descriptor().layout() {
        Layout::Document { history } => {
            let documents = store.documents(kind)?;
            match version {
                None => documents.get(&key)?,
                Some(version) if history => {
                    let (history, current) = documents.get_chain(&key)?.into_parts();
                    history
                        .into_iter()
                        .chain(std::iter::once(current))
                        .find(|record| record.version() == version)
                        .ok_or_else(|| format!("no version {version} for {key}"))?
                        .into_content()?
                }
                Some(_) => return Err(format!("kind {} keeps no versions", kind.name()).into()),
            }
        }
        Layout::VersionDirectory => {
            let argument = version.map_or(VersionArgument::Highest, VersionArgument::from);
            let record = store.versioned(kind)?.get_entity_version(&key, argument)?;
            eprintln!("version {}", record.version());
            record.into_content()?
        }
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
