//! Round-complete detection.
//!
//! A round is complete when every expected participant turn has reached a
//! terminal finish reason — success or error — and nothing is streaming.
//! The moderation trigger evaluates this predicate; the predicate itself
//! never fires anything.

use crate::core::ids;
use crate::message::entities::Message;

/// True iff every expected participant message for `round` exists with a
/// terminal finish reason and `is_streaming` is false.
///
/// `expected_ids` are the message ids the round's roster implies (one per
/// enabled participant). A round stopped early — fewer messages than
/// expected — is not complete, even if everything present is terminal.
pub fn round_complete(
    messages: &[Message],
    round: u32,
    expected_ids: &[String],
    is_streaming: bool,
) -> bool {
    if is_streaming {
        return false;
    }
    if expected_ids.is_empty() {
        return false;
    }
    expected_ids.iter().all(|id| {
        messages
            .iter()
            .any(|m| m.round_number == Some(round) && m.id == *id && m.is_terminal())
    })
}

/// The participant message ids a roster of `count` participants implies.
pub fn expected_participant_ids(thread_id: &str, round: u32, count: u32) -> Vec<String> {
    (0..count)
        .map(|i| ids::participant_message_id(thread_id, round, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::entities::FinishReason;
    use chrono::Utc;

    fn terminal(round: u32, index: u32, reason: FinishReason) -> Message {
        Message::participant("t1", round, index, Utc::now()).with_finish_reason(reason)
    }

    #[test]
    fn complete_when_all_expected_are_terminal() {
        let expected = expected_participant_ids("t1", 0, 2);
        let log = vec![
            Message::user("t1", 0, "q", Utc::now()),
            terminal(0, 0, FinishReason::Stop),
            terminal(0, 1, FinishReason::Error),
        ];
        assert!(round_complete(&log, 0, &expected, false));
    }

    #[test]
    fn false_while_streaming_even_if_log_looks_done() {
        let expected = expected_participant_ids("t1", 0, 2);
        let log = vec![
            terminal(0, 0, FinishReason::Stop),
            terminal(0, 1, FinishReason::Stop),
        ];
        assert!(!round_complete(&log, 0, &expected, true));
    }

    #[test]
    fn false_when_a_turn_is_still_in_flight() {
        let expected = expected_participant_ids("t1", 0, 2);
        let log = vec![
            terminal(0, 0, FinishReason::Stop),
            Message::participant("t1", 0, 1, Utc::now()),
        ];
        assert!(!round_complete(&log, 0, &expected, false));
    }

    #[test]
    fn false_when_stopped_early_with_missing_turns() {
        let expected = expected_participant_ids("t1", 0, 3);
        let log = vec![
            terminal(0, 0, FinishReason::Stop),
            terminal(0, 1, FinishReason::Stop),
        ];
        assert!(!round_complete(&log, 0, &expected, false));
    }

    #[test]
    fn other_rounds_do_not_satisfy_expectations() {
        let expected = expected_participant_ids("t1", 1, 1);
        let log = vec![terminal(0, 0, FinishReason::Stop)];
        assert!(!round_complete(&log, 1, &expected, false));
    }

    #[test]
    fn empty_roster_is_never_complete() {
        assert!(!round_complete(&[], 0, &[], false));
    }
}
