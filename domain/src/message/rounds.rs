//! Round arithmetic over the message log.
//!
//! Round numbers are derived from the log alone, and only **user** messages
//! advance the counter: assistant fragments left behind by an aborted round
//! must never bump the next submission into a fresh round. Messages without
//! round metadata are skipped entirely.

use super::entities::Message;
use std::collections::BTreeMap;

/// Round number the next submission will use: one past the highest round
/// that has a user message, or 0 for an empty log.
pub fn next_round(messages: &[Message]) -> u32 {
    messages
        .iter()
        .filter(|m| m.is_user())
        .filter_map(|m| m.round_number)
        .max()
        .map(|r| r + 1)
        .unwrap_or(0)
}

/// Round of the **last** user message in log order, or `None` if no user
/// message exists. Uses log order rather than the maximum so an out-of-order
/// retry of an earlier round reports that earlier round.
pub fn current_round(messages: &[Message]) -> Option<u32> {
    messages
        .iter()
        .rev()
        .find(|m| m.is_user())
        .and_then(|m| m.round_number)
}

/// The messages of one round, in log order.
#[derive(Debug, Clone, Default)]
pub struct RoundMessages<'a> {
    pub user: Option<&'a Message>,
    pub participants: Vec<&'a Message>,
    pub moderator: Option<&'a Message>,
}

/// Group the log by round number. Messages without round metadata are
/// dropped from the grouping.
pub fn group_by_round(messages: &[Message]) -> BTreeMap<u32, RoundMessages<'_>> {
    let mut rounds: BTreeMap<u32, RoundMessages<'_>> = BTreeMap::new();
    for message in messages {
        let Some(round) = message.round_number else {
            continue;
        };
        let entry = rounds.entry(round).or_default();
        if message.is_user() {
            entry.user = Some(message);
        } else if message.is_moderator {
            entry.moderator = Some(message);
        } else {
            entry.participants.push(message);
        }
    }
    rounds
}

/// 1-based round number for display. Presentational only: storage and every
/// comparison stay 0-based.
pub fn display_round(stored: u32) -> u32 {
    stored + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::entities::FinishReason;
    use chrono::Utc;

    fn user(round: u32) -> Message {
        Message::user("t1", round, "q", Utc::now())
    }

    fn participant(round: u32, index: u32) -> Message {
        Message::participant("t1", round, index, Utc::now())
            .with_finish_reason(FinishReason::Stop)
    }

    #[test]
    fn empty_log_starts_at_round_zero() {
        assert_eq!(next_round(&[]), 0);
        assert_eq!(current_round(&[]), None);
    }

    #[test]
    fn assistant_fragments_do_not_advance_the_round() {
        // Aborted round: participant messages exist but no user message
        let log = vec![participant(0, 0), participant(0, 1)];
        assert_eq!(next_round(&log), 0);
    }

    #[test]
    fn next_round_follows_user_messages_only() {
        // Scenario A from the round arithmetic oracle
        let mut log = vec![user(0)];
        assert_eq!(next_round(&log), 1);
        assert_eq!(current_round(&log), Some(0));

        log.push(participant(0, 0));
        log.push(participant(0, 1));
        assert_eq!(current_round(&log), Some(0));

        log.push(user(1));
        assert_eq!(next_round(&log), 2);
        assert_eq!(current_round(&log), Some(1));
    }

    #[test]
    fn never_returns_a_round_already_submitted() {
        let log = vec![user(0), user(1), user(2)];
        let next = next_round(&log);
        assert!(log.iter().all(|m| m.round_number != Some(next)));
        assert_eq!(next, 3);
    }

    #[test]
    fn missing_round_metadata_is_skipped_not_round_zero() {
        let mut orphan = user(7);
        orphan.round_number = None;
        let log = vec![orphan];
        assert_eq!(next_round(&log), 0);
        assert_eq!(current_round(&log), None);
        assert!(group_by_round(&log).is_empty());
    }

    #[test]
    fn current_round_uses_log_order_for_retries() {
        // A retried round-0 user message appended after round 1
        let log = vec![user(0), user(1), user(0)];
        assert_eq!(current_round(&log), Some(0));
        // next_round still uses the maximum
        assert_eq!(next_round(&log), 2);
    }

    #[test]
    fn group_by_round_splits_roles() {
        let log = vec![
            user(0),
            participant(0, 0),
            participant(0, 1),
            Message::moderator("t1", 0, Utc::now()).with_finish_reason(FinishReason::Stop),
            user(1),
            participant(1, 0),
        ];
        let rounds = group_by_round(&log);
        assert_eq!(rounds.len(), 2);
        let r0 = &rounds[&0];
        assert!(r0.user.is_some());
        assert_eq!(r0.participants.len(), 2);
        assert!(r0.moderator.is_some());
        let r1 = &rounds[&1];
        assert_eq!(r1.participants.len(), 1);
        assert!(r1.moderator.is_none());
    }

    #[test]
    fn display_round_is_one_based() {
        assert_eq!(display_round(0), 1);
        assert_eq!(display_round(4), 5);
    }
}
