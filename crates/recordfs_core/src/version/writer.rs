//! Producing the next chain state.

use super::chain::{VersionChain, VersionRecord};
use chrono::{DateTime, Utc};

/// Derives the next [`VersionChain`] from the previous one and new content.
///
/// # Example
///
/// ```rust
/// use recordfs_core::VersionedRecordWriter;
///
/// let first = VersionedRecordWriter::write(None, "draft");
/// let second = VersionedRecordWriter::write(Some(first), "final");
/// assert_eq!(second.version(), 1);
/// assert_eq!(second.history()[0].materialized(), Some(&"draft"));
/// ```
pub struct VersionedRecordWriter;

impl VersionedRecordWriter {
    /// Appends `content` as the new current snapshot, stamped now.
    pub fn write<T>(old: Option<VersionChain<T>>, content: T) -> VersionChain<T> {
        Self::write_at(old, content, Utc::now())
    }

    /// Appends `content` as the new current snapshot, stamped `now`.
    ///
    /// The previous current snapshot moves unchanged to the end of the
    /// history. The new version is one past the last historic version, or 0
    /// when there is no previous chain.
    pub fn write_at<T>(old: Option<VersionChain<T>>, content: T, now: DateTime<Utc>) -> VersionChain<T> {
        let history = match old {
            Some(chain) => {
                let (mut history, current) = chain.into_parts();
                history.push(current);
                history
            }
            None => Vec::new(),
        };
        let version = history.last().map_or(0, |last| last.version() + 1);
        VersionChain::assemble(history, VersionRecord::new(content, version, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn first_write_is_version_zero() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let chain = VersionedRecordWriter::write_at(None, "a", now);
        assert_eq!(chain.version(), 0);
        assert!(chain.history().is_empty());
        assert_eq!(chain.current().timestamp(), now);
    }

    #[test]
    fn previous_current_moves_to_history_unchanged() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let chain = VersionedRecordWriter::write_at(None, "a", t0);
        let chain = VersionedRecordWriter::write_at(Some(chain), "b", t1);

        assert_eq!(chain.history().len(), 1);
        let old = &chain.history()[0];
        assert_eq!(old.version(), 0);
        assert_eq!(old.timestamp(), t0);
        assert_eq!(old.materialized(), Some(&"a"));
        assert_eq!(chain.current().materialized(), Some(&"b"));
        assert_eq!(chain.current().timestamp(), t1);
    }

    proptest! {
        #[test]
        fn versions_are_sequential(writes in 1usize..40) {
            let mut chain = None;
            for i in 0..writes {
                chain = Some(VersionedRecordWriter::write(chain, i));
            }
            let chain = chain.unwrap();
            let versions: Vec<u64> = chain.records().map(|r| r.version()).collect();
            let expected: Vec<u64> = (0..writes as u64).collect();
            prop_assert_eq!(versions, expected);
            prop_assert_eq!(chain.current().materialized(), Some(&(writes - 1)));
        }
    }
}
