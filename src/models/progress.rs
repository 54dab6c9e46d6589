use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the background indexing worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    /// Indexing is turned off entirely; the index handle may not exist.
    /// Dirty markers are retained across disable/enable cycles.
    Disabled,
    /// Enabled with an empty dirty set.
    Idle,
    /// The worker is actively draining the dirty set.
    Indexing,
    /// The worker has been asked to suspend and stops after finishing its
    /// current item.
    Paused,
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "disabled",
            Self::Idle => "idle",
            Self::Indexing => "indexing",
            Self::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Snapshot of indexing progress counters.
///
/// `logs_to_index` may grow while the worker drains if new identifiers are
/// marked dirty concurrently; both counters reset when a fresh cycle starts
/// after the dirty set fully drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingProgress {
    pub logs_indexed: u64,
    pub logs_to_index: u64,
}

impl IndexingProgress {
    /// True when everything known so far has been processed.
    pub fn is_complete(&self) -> bool {
        self.logs_indexed >= self.logs_to_index
    }
}

impl fmt::Display for IndexingProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.logs_indexed, self.logs_to_index)
    }
}
