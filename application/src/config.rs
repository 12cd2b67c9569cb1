//! Orchestration policy
//!
//! The staleness and timeout windows are policy, not protocol: they were
//! tuned empirically, so they are configurable values with defaults rather
//! than constants.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunable timing policy for the round engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorPolicy {
    /// A pre-search stuck in `streaming` this long is force-completed
    pub presearch_stale_secs: u64,
    /// How long to wait for changelog entries before clearing the gate
    pub changelog_wait_secs: u64,
    /// A resumption record older than this is treated as no active stream
    pub resumption_stale_secs: u64,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self {
            presearch_stale_secs: 75,
            changelog_wait_secs: 30,
            resumption_stale_secs: 3600,
        }
    }
}

impl OrchestratorPolicy {
    pub fn presearch_stale(&self) -> Duration {
        Duration::seconds(self.presearch_stale_secs as i64)
    }

    pub fn changelog_wait(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.changelog_wait_secs)
    }

    pub fn resumption_stale(&self) -> Duration {
        Duration::seconds(self.resumption_stale_secs as i64)
    }
}
