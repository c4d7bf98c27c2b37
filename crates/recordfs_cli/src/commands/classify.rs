//! Classify command implementation.

use crate::schema::open_store;
use std::path::Path;

/// Runs the classify command.
///
/// Reports which kind and key a path belongs to. Paths that belong to no
/// kind are reported as ignored, which is not an error.
pub fn run(schema: &Path, paths: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let (store, _) = open_store(schema, None)?;
    for path in paths {
        match store.classify(path) {
            Some(found) => {
                let what = if found.container { "container" } else { "record" };
                print!("{path}: {} {what} {}", found.kind.name(), found.key);
                if let Some(version) = found.version {
                    print!(" version {version}");
                }
                println!();
            }
            None => println!("{path}: ignored"),
        }
    }
    Ok(())
}
