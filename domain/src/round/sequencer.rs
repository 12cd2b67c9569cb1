//! Participant turn sequencing.
//!
//! Turns within a round are strictly serial, ordered by ascending committed
//! priority. Each turn's generation context is the full history of earlier
//! rounds plus, within the current round, the user prompt and the completed
//! turns that came before it — a participant never sees a turn that starts
//! after its own.

use crate::message::entities::Message;
use crate::thread::participant::{Participant, enabled_in_order};

/// The participants taking turns this round: committed, enabled, ascending
/// priority. Per-round `participant_index` is the position in this roster.
pub fn round_roster(participants: &[Participant]) -> Vec<&Participant> {
    enabled_in_order(participants)
}

/// Messages visible to the participant at `index` when generating its
/// round-`round` turn, in log order.
///
/// - every message from rounds strictly before `round` (moderator included)
/// - the round's user message
/// - terminal participant turns of this round with a lower index
pub fn generation_context<'a>(messages: &'a [Message], round: u32, index: u32) -> Vec<&'a Message> {
    messages
        .iter()
        .filter(|m| match m.round_number {
            None => false,
            Some(r) if r < round => true,
            Some(r) if r > round => false,
            _ => {
                if m.is_user() {
                    true
                } else if m.is_participant() && m.is_terminal() {
                    m.participant_index.is_some_and(|i| i < index)
                } else {
                    false
                }
            }
        })
        .collect()
}
