//! Watch command implementation.

use crate::schema::open_store;
use recordfs_core::WatchEventKind;
use std::path::Path;

/// Runs the watch command.
///
/// Prints record changes as they happen, either for every kind or for one.
/// Stops after `limit` events when given; otherwise runs until interrupted.
pub fn run(
    schema: &Path,
    root: &Path,
    kind: Option<&str>,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (store, _) = open_store(schema, Some(root))?;
    let watch = match kind {
        Some(kind) => store.watch_kind(kind)?,
        None => store.watch()?,
    };
    eprintln!("Watching {} (Ctrl-C to stop)", root.display());

    for event in watch.take(limit.unwrap_or(usize::MAX)) {
        let change = match event.change {
            WatchEventKind::Created => "created",
            WatchEventKind::Modified => "modified",
            WatchEventKind::Deleted => "deleted",
        };
        print!("{change:<8} {} {} {}", event.kind.name(), event.key, event.address);
        if let Some(version) = event.version {
            print!(" version {version}");
        }
        println!();
    }
    Ok(())
}
