//! Stream resumption: the durable anchor for recovering mid-round state.
//!
//! This record is the only state that must survive a client restart. The
//! "what do I do next" computation ([`StreamResumptionState::next_to_stream`])
//! is pure and side-effect-free so a reconnecting client can re-run it any
//! number of times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-participant stream status inside a resumption record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Active,
    Completed,
    Failed,
}

/// Durable per-thread resumption record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResumptionState {
    pub thread_id: String,
    pub round_number: u32,
    pub current_participant_index: u32,
    /// How many participant turns this round expects in total
    pub total_participants: u32,
    /// Status per participant index; missing means "not started"
    pub statuses: BTreeMap<u32, StreamStatus>,
    /// Deterministic id of the currently active stream
    pub stream_id: String,
    /// True once the moderation attempt for this round failed
    #[serde(default)]
    pub moderation_failed: bool,
    pub updated_at: DateTime<Utc>,
}

impl StreamResumptionState {
    pub fn new(
        thread_id: impl Into<String>,
        round: u32,
        total_participants: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let thread_id = thread_id.into();
        let stream_id = crate::core::ids::stream_id(&thread_id, round, 0);
        Self {
            thread_id,
            round_number: round,
            current_participant_index: 0,
            total_participants,
            statuses: BTreeMap::new(),
            stream_id,
            moderation_failed: false,
            updated_at: now,
        }
    }

    /// Record a participant's stream status and re-anchor the active stream
    /// id. One call mutates everything an observer may correlate.
    pub fn mark(&mut self, index: u32, status: StreamStatus, now: DateTime<Utc>) {
        self.statuses.insert(index, status);
        self.current_participant_index = index;
        self.stream_id = crate::core::ids::stream_id(&self.thread_id, self.round_number, index);
        self.updated_at = now;
    }

    pub fn mark_moderation_failed(&mut self, now: DateTime<Utc>) {
        self.moderation_failed = true;
        self.updated_at = now;
    }

    /// The lowest participant index that still needs streaming: missing or
    /// `Active`. `Failed` turns are skipped, not retried in place. `None`
    /// means every turn is accounted for and the round is complete.
    pub fn next_to_stream(&self) -> Option<u32> {
        (0..self.total_participants).find(|i| {
            matches!(self.statuses.get(i), None | Some(StreamStatus::Active))
        })
    }

    pub fn is_round_complete(&self) -> bool {
        self.next_to_stream().is_none()
    }

    /// A record older than `max_age` must not be acted on as current.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.updated_at > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn active_turn_is_resumed_in_place() {
        // Resumption oracle: {0: completed, 1: active}, total 3 -> next is 1
        let mut state = StreamResumptionState::new("t1", 0, 3, Utc::now());
        state.mark(0, StreamStatus::Completed, Utc::now());
        state.mark(1, StreamStatus::Active, Utc::now());
        assert_eq!(state.next_to_stream(), Some(1));
        assert!(!state.is_round_complete());
    }

    #[test]
    fn all_completed_means_round_complete() {
        let mut state = StreamResumptionState::new("t1", 0, 3, Utc::now());
        for i in 0..3 {
            state.mark(i, StreamStatus::Completed, Utc::now());
        }
        assert_eq!(state.next_to_stream(), None);
        assert!(state.is_round_complete());
    }

    #[test]
    fn failed_turns_are_skipped_not_retried() {
        let mut state = StreamResumptionState::new("t1", 0, 3, Utc::now());
        state.mark(0, StreamStatus::Completed, Utc::now());
        state.mark(1, StreamStatus::Failed, Utc::now());
        assert_eq!(state.next_to_stream(), Some(2));
    }

    #[test]
    fn missing_entries_stream_first() {
        let mut state = StreamResumptionState::new("t1", 0, 4, Utc::now());
        state.mark(2, StreamStatus::Completed, Utc::now());
        assert_eq!(state.next_to_stream(), Some(0));
    }

    #[test]
    fn next_to_stream_is_idempotent() {
        let mut state = StreamResumptionState::new("t1", 0, 2, Utc::now());
        state.mark(0, StreamStatus::Completed, Utc::now());
        let first = state.next_to_stream();
        assert_eq!(first, state.next_to_stream());
        assert_eq!(first, Some(1));
    }

    #[test]
    fn mark_re_anchors_stream_id_and_index() {
        let mut state = StreamResumptionState::new("t1", 2, 3, Utc::now());
        state.mark(1, StreamStatus::Active, Utc::now());
        assert_eq!(state.current_participant_index, 1);
        assert_eq!(state.stream_id, "t1_r2_p1");
    }

    #[test]
    fn old_records_are_stale() {
        let start = Utc::now();
        let state = StreamResumptionState::new("t1", 0, 2, start);
        let max_age = Duration::hours(1);
        assert!(!state.is_stale(start + Duration::minutes(30), max_age));
        assert!(state.is_stale(start + Duration::minutes(61), max_age));
    }
}
