//! Pre-search: the optional per-round web-search step.
//!
//! One record per round, entered only when web search was enabled at commit
//! time. The status machine moves strictly forward; terminal states are
//! never downgraded, so a late `pending` write cannot clobber a result that
//! already landed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a round's pre-search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreSearchStatus {
    #[default]
    Pending,
    Streaming,
    Complete,
    Error,
}

impl PreSearchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PreSearchStatus::Complete | PreSearchStatus::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            PreSearchStatus::Pending => 0,
            PreSearchStatus::Streaming => 1,
            PreSearchStatus::Complete | PreSearchStatus::Error => 2,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PreSearchStatus::Pending => "pending",
            PreSearchStatus::Streaming => "streaming",
            PreSearchStatus::Complete => "complete",
            PreSearchStatus::Error => "error",
        }
    }
}

/// A round's web-search step (Entity, at most one per round)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreSearch {
    pub id: String,
    pub thread_id: String,
    pub round_number: u32,
    pub status: PreSearchStatus,
    pub user_query: String,
    /// Search result payload once complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// True when a stuck stream was force-completed by the staleness window
    #[serde(default)]
    pub forced: bool,
    pub updated_at: DateTime<Utc>,
}

impl PreSearch {
    pub fn new(
        thread_id: impl Into<String>,
        round: u32,
        user_query: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: format!("{thread_id}_r{round}_presearch"),
            thread_id,
            round_number: round,
            status: PreSearchStatus::Pending,
            user_query: user_query.into(),
            result: None,
            forced: false,
            updated_at: now,
        }
    }

    /// Advance the status machine. Returns false (and leaves the record
    /// untouched) for any non-forward write, including `pending` arriving
    /// after `streaming` and anything after a terminal state.
    pub fn advance(&mut self, next: PreSearchStatus, now: DateTime<Utc>) -> bool {
        if next.rank() <= self.status.rank() {
            return false;
        }
        self.status = next;
        self.updated_at = now;
        true
    }

    /// Force a stuck stream to `complete` so the round unblocks. Marks the
    /// record so logs can tell it apart from a real result.
    pub fn force_complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = PreSearchStatus::Complete;
        self.forced = true;
        self.updated_at = now;
        true
    }

    /// True once the round may begin streaming participants.
    pub fn unblocks_round(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the stream has been inactive longer than `max_idle`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_idle: chrono::Duration) -> bool {
        self.status == PreSearchStatus::Streaming && now - self.updated_at > max_idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn presearch() -> PreSearch {
        PreSearch::new("t1", 0, "what is rust", Utc::now())
    }

    #[test]
    fn statuses_advance_forward() {
        let mut ps = presearch();
        assert!(ps.advance(PreSearchStatus::Streaming, Utc::now()));
        assert!(ps.advance(PreSearchStatus::Complete, Utc::now()));
        assert!(ps.unblocks_round());
    }

    #[test]
    fn pending_cannot_overwrite_streaming() {
        let mut ps = presearch();
        ps.advance(PreSearchStatus::Streaming, Utc::now());
        assert!(!ps.advance(PreSearchStatus::Pending, Utc::now()));
        assert_eq!(ps.status, PreSearchStatus::Streaming);
    }

    #[test]
    fn terminal_states_are_never_downgraded() {
        let mut ps = presearch();
        ps.advance(PreSearchStatus::Error, Utc::now());
        assert!(!ps.advance(PreSearchStatus::Streaming, Utc::now()));
        assert!(!ps.advance(PreSearchStatus::Complete, Utc::now()));
        assert_eq!(ps.status, PreSearchStatus::Error);
    }

    #[test]
    fn error_unblocks_the_round_like_complete() {
        let mut ps = presearch();
        ps.advance(PreSearchStatus::Error, Utc::now());
        assert!(ps.unblocks_round());
    }

    #[test]
    fn force_complete_marks_the_record() {
        let mut ps = presearch();
        ps.advance(PreSearchStatus::Streaming, Utc::now());
        assert!(ps.force_complete(Utc::now()));
        assert_eq!(ps.status, PreSearchStatus::Complete);
        assert!(ps.forced);
        // a second force is a no-op
        assert!(!ps.force_complete(Utc::now()));
    }

    #[test]
    fn staleness_requires_streaming_and_idle_time() {
        let start = Utc::now();
        let mut ps = PreSearch::new("t1", 0, "q", start);
        let window = Duration::seconds(75);

        assert!(!ps.is_stale(start + Duration::seconds(200), window));

        ps.advance(PreSearchStatus::Streaming, start);
        assert!(!ps.is_stale(start + Duration::seconds(30), window));
        assert!(ps.is_stale(start + Duration::seconds(76), window));
    }
}
