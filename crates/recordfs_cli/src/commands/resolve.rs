//! Resolve command implementation.

use crate::schema::{find_kind, open_store, parse_key};
use std::path::Path;

/// Runs the resolve command.
///
/// Prints the address of the record with the given key, of one of its
/// versions, or its listing prefix.
pub fn run(
    schema: &Path,
    kind: &str,
    key: &[String],
    version: Option<u64>,
    listing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_, kinds) = open_store(schema, None)?;
    let kind = find_kind(&kinds, kind)?;
    let key = parse_key(key)?;
    let resolver = kind.descriptor().resolver();

    let address = match (listing, version) {
        (true, _) => resolver.resolve_listing_prefix(&key)?,
        (false, Some(version)) => resolver.resolve_version(&key, version)?,
        (false, None) => resolver.resolve(&key)?,
    };
    println!("{address}");
    Ok(())
}
