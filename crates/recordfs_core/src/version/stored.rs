//! Persisted shapes of versioned records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version number and write time of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStamp {
    /// Version number.
    pub version: u64,
    /// Write time.
    pub ts: DateTime<Utc>,
}

impl VersionStamp {
    /// Stamp given to a record that was stored without one.
    pub const UNSTAMPED: Self = Self {
        version: 0,
        ts: DateTime::<Utc>::UNIX_EPOCH,
    };
}

/// One prior snapshot embedded in a [`StoredDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Version number.
    pub version: u64,
    /// Write time.
    pub ts: DateTime<Utc>,
    /// The record as it was, kept as a raw tree until someone asks for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Value>,
}

/// A document kind's file when history is enabled.
///
/// The record's own fields sit at the top level next to `history` and
/// `currentVersion`, so the file still reads as the record itself:
///
/// ```json
/// {
///   "id": "1f30d7b6-0296-489a-9615-55868aeef78a",
///   "name": "gear",
///   "history": [{ "version": 0, "ts": "...", "entity": { "name": "cog" } }],
///   "currentVersion": { "version": 1, "ts": "..." }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Current record fields.
    #[serde(flatten)]
    pub content: Map<String, Value>,
    /// Prior snapshots, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Stamp of the current snapshot. Absent on documents written before
    /// history was turned on for their kind.
    #[serde(rename = "currentVersion", default)]
    pub current_version: Option<VersionStamp>,
}

/// One file of a version directory kind, `<container>/<n><suffix>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionFile<T> {
    /// Version number; matches the file name.
    pub version: u64,
    /// Write time.
    pub ts: DateTime<Utc>,
    /// The record.
    pub entity: T,
}
