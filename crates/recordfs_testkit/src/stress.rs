//! Stress tests for recordfs.
//!
//! These tests verify behavior under heavy load and concurrent access.

use crate::fixtures::{note_kind, widget_kind, Note, Widget};
use recordfs_core::{Key, Store};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of distinct records.
    pub record_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            record_count: 100,
        }
    }
}

fn record_id(i: usize) -> Uuid {
    Uuid::from_u128(i as u128 + 1)
}

/// Run a sequential document write stress test.
pub fn stress_document_writes(store: &Store, config: &StressConfig) -> StressTestResult {
    let Ok(widgets) = store.documents(&widget_kind()) else {
        return StressTestResult::new(0, config.operations, Duration::ZERO);
    };

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let id = record_id(i % config.record_count);
        match widgets.put_record(Widget::new(id, format!("write {i}"))) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a mixed read/write/delete document stress test.
///
/// Reads and deletes of records that are currently absent count as
/// successful.
pub fn stress_mixed_operations(store: &Store, config: &StressConfig) -> StressTestResult {
    let Ok(widgets) = store.documents(&widget_kind()) else {
        return StressTestResult::new(0, config.operations, Duration::ZERO);
    };

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let id = record_id(i % config.record_count);
        let key = Key::new().with("id", id);

        let result = if i % 3 == 0 {
            widgets.put_record(Widget::new(id, "mixed")).map(|_| ())
        } else if i % 3 == 1 {
            widgets.get(&key).map(|_| ())
        } else {
            widgets.delete(&key)
        };

        match result {
            Ok(()) => successful += 1,
            Err(e) if e.is_not_found() => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent versioned write stress test.
///
/// Every thread appends versions to the same note. Returns the run result
/// and the versions found on disk afterwards, ascending.
pub fn stress_concurrent_version_puts(store: &Store, config: &StressConfig) -> (StressTestResult, Vec<u64>) {
    let widget_id = record_id(0);
    let note_id = record_id(1);
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..config.threads {
            let successful = &successful;
            let failed = &failed;
            scope.spawn(move || {
                let Ok(notes) = store.versioned(&note_kind()) else {
                    failed.fetch_add(ops_per_thread, Ordering::Relaxed);
                    return;
                };
                for i in 0..ops_per_thread {
                    let note = Note::new(widget_id, note_id, format!("thread {t} write {i}"));
                    match notes.put_record(note) {
                        Ok(_) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    let result = StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    );

    let key = Key::new().with("widgetId", widget_id).with("id", note_id);
    let versions = store
        .versioned(&note_kind())
        .and_then(|notes| notes.get_all_versions(&key))
        .map(|records| records.iter().map(|r| r.version()).collect())
        .unwrap_or_default();

    (result, versions)
}

/// Acquires and releases `cycles` watches, returning how many remain held.
pub fn stress_watch_cycles(store: &Store, cycles: usize) -> usize {
    for _ in 0..cycles {
        if let Ok(watch) = store.watch() {
            drop(watch);
        }
    }
    store.active_watches()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestStore;
    use recordfs_core::Config;

    #[test]
    fn test_document_writes() {
        let store = TestStore::memory();
        let config = StressConfig {
            operations: 500,
            record_count: 50,
            ..Default::default()
        };

        let result = stress_document_writes(&store, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 500);
        let widgets = store.documents(&widget_kind()).unwrap();
        assert_eq!(widgets.list_all().unwrap().len(), 50);
    }

    #[test]
    fn test_mixed_operations() {
        let store = TestStore::memory();
        let config = StressConfig {
            operations: 600,
            record_count: 20,
            ..Default::default()
        };

        let result = stress_mixed_operations(&store, &config);
        assert_eq!(result.failed_ops, 0);
    }

    #[test]
    fn test_concurrent_version_puts_on_disk() {
        let store = TestStore::file_with_config(Config::default().put_retries(64));
        let config = StressConfig {
            operations: 40,
            threads: 4,
            ..Default::default()
        };

        let (result, versions) = stress_concurrent_version_puts(&store, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(versions, (0..40).collect::<Vec<u64>>());
    }

    #[test]
    fn test_watch_cycles() {
        let store = TestStore::file();
        assert_eq!(stress_watch_cycles(&store, 200), 0);
        let store = TestStore::memory();
        assert_eq!(stress_watch_cycles(&store, 200), 0);
    }
}
