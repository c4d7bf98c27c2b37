//! Version records and chains.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;

/// One snapshot of a record.
///
/// Historic snapshots read from storage keep their raw JSON tree and are only
/// deserialized on first access to [`VersionRecord::content`], so callers that
/// never look at history never pay for decoding it.
#[derive(Debug, Clone)]
pub struct VersionRecord<T> {
    version: u64,
    timestamp: DateTime<Utc>,
    raw: Option<Value>,
    content: OnceLock<T>,
}

impl<T> VersionRecord<T> {
    /// A snapshot with materialized content.
    pub fn new(content: T, version: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            version,
            timestamp,
            raw: None,
            content: OnceLock::from(content),
        }
    }

    /// A snapshot whose content is materialized from `raw` on demand.
    #[must_use]
    pub fn from_raw(raw: Option<Value>, version: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            version,
            timestamp,
            raw,
            content: OnceLock::new(),
        }
    }

    /// Version number.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// When this version was written.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Content, if already materialized.
    #[must_use]
    pub fn materialized(&self) -> Option<&T> {
        self.content.get()
    }

    /// Raw stored tree, if this snapshot came from storage.
    #[must_use]
    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }
}

impl<T: DeserializeOwned> VersionRecord<T> {
    /// Content of this snapshot, materializing it on first access.
    ///
    /// # Errors
    ///
    /// Returns `ReadFailure("missing raw content")` if the snapshot carries
    /// neither content nor a raw tree, or a `ReadFailure` wrapping the decode
    /// error if the raw tree does not fit `T`.
    pub fn content(&self) -> CoreResult<&T> {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }
        let value = Self::decode(self.version, self.raw.clone())?;
        Ok(self.content.get_or_init(|| value))
    }

    /// Consumes the snapshot, returning its content.
    ///
    /// # Errors
    ///
    /// Same as [`VersionRecord::content`].
    pub fn into_content(self) -> CoreResult<T> {
        let Self {
            version, raw, content, ..
        } = self;
        match content.into_inner() {
            Some(content) => Ok(content),
            None => Self::decode(version, raw),
        }
    }

    fn decode(version: u64, raw: Option<Value>) -> CoreResult<T> {
        let raw = raw.ok_or_else(|| CoreError::read_failure("missing raw content"))?;
        serde_json::from_value(raw)
            .map_err(|e| CoreError::read_failure_caused_by(format!("cannot materialize version {version}"), e))
    }
}

/// History of prior snapshots plus the current one.
///
/// Always satisfies `history[i].version() == i` and
/// `current.version() == history.len()`.
#[derive(Debug, Clone)]
pub struct VersionChain<T> {
    history: Vec<VersionRecord<T>>,
    current: VersionRecord<T>,
}

impl<T> VersionChain<T> {
    /// Assembles a chain, checking version numbering.
    ///
    /// # Errors
    ///
    /// Returns `ReadFailure` if the versions are not `0, 1, 2, ...` with the
    /// current snapshot last.
    pub fn new(history: Vec<VersionRecord<T>>, current: VersionRecord<T>) -> CoreResult<Self> {
        if let Some((index, record)) = history
            .iter()
            .enumerate()
            .find(|(index, record)| record.version() != *index as u64)
        {
            return Err(CoreError::read_failure(format!(
                "history entry {index} has version {}",
                record.version()
            )));
        }
        if current.version() != history.len() as u64 {
            return Err(CoreError::read_failure(format!(
                "current version {} after {} historic versions",
                current.version(),
                history.len()
            )));
        }
        Ok(Self { history, current })
    }

    /// A chain with no history.
    ///
    /// # Errors
    ///
    /// Returns `ReadFailure` unless `current` is version 0.
    pub fn initial(current: VersionRecord<T>) -> CoreResult<Self> {
        Self::new(Vec::new(), current)
    }

    pub(super) fn assemble(history: Vec<VersionRecord<T>>, current: VersionRecord<T>) -> Self {
        debug_assert_eq!(current.version(), history.len() as u64);
        Self { history, current }
    }

    /// Prior snapshots, oldest first.
    #[must_use]
    pub fn history(&self) -> &[VersionRecord<T>] {
        &self.history
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> &VersionRecord<T> {
        &self.current
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.version()
    }

    /// Every snapshot, oldest first, current last.
    pub fn records(&self) -> impl Iterator<Item = &VersionRecord<T>> {
        self.history.iter().chain(std::iter::once(&self.current))
    }

    /// Splits the chain into history and current.
    #[must_use]
    pub fn into_parts(self) -> (Vec<VersionRecord<T>>, VersionRecord<T>) {
        (self.history, self.current)
    }
}
