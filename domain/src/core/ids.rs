//! Deterministic identifiers for per-round records.
//!
//! Every per-round artifact is keyed by thread, round, and (for participant
//! turns) the per-round participant index. The same scheme doubles as the
//! stream id used by the resumption store, so a reconnecting client can
//! rebuild the key without any stored mapping.

/// Id of a participant's turn message: `{thread}_r{round}_p{index}`.
pub fn participant_message_id(thread_id: &str, round: u32, index: u32) -> String {
    format!("{thread_id}_r{round}_p{index}")
}

/// Id of the round's user message: `{thread}_r{round}_user`.
pub fn user_message_id(thread_id: &str, round: u32) -> String {
    format!("{thread_id}_r{round}_user")
}

/// Id of the round's moderator message: `{thread}_r{round}_moderator`.
pub fn moderator_message_id(thread_id: &str, round: u32) -> String {
    format!("{thread_id}_r{round}_moderator")
}

/// Stream id for a participant turn. Identical to the message id, which is
/// what makes resumption keys derivable after a reload.
pub fn stream_id(thread_id: &str, round: u32, index: u32) -> String {
    participant_message_id(thread_id, round, index)
}
