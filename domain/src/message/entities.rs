//! Message domain entities

use crate::core::ids;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message in the conversation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Why a message's stream ended.
///
/// `Unknown` means the stream is still in flight; every other value is
/// terminal, whatever it is. Error counts as terminal for round-completion
/// purposes just like a clean stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
    #[default]
    Unknown,
}

impl FinishReason {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FinishReason::Unknown)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Error => "error",
            FinishReason::Unknown => "unknown",
        }
    }
}

/// A message in the conversation log (Entity)
///
/// Ids follow the deterministic per-round scheme from [`crate::core::ids`].
/// `participant_index` is per-round (restarts at 0 every round), not a
/// lifetime counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    /// 0-based round; display layers add 1. `None` for records that lost
    /// their round metadata — those are skipped by round arithmetic, never
    /// treated as round 0.
    pub round_number: Option<u32>,
    /// Per-round turn index; None for user and moderator messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_index: Option<u32>,
    /// True for the round's moderator synthesis message
    #[serde(default)]
    pub is_moderator: bool,
    pub content: String,
    pub finish_reason: FinishReason,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The round's user prompt. User messages are terminal on creation.
    pub fn user(
        thread_id: impl Into<String>,
        round: u32,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: ids::user_message_id(&thread_id, round),
            thread_id,
            role: MessageRole::User,
            round_number: Some(round),
            participant_index: None,
            is_moderator: false,
            content: content.into(),
            finish_reason: FinishReason::Stop,
            created_at: now,
        }
    }

    /// A participant's turn, created in-flight (`finish_reason = Unknown`).
    pub fn participant(
        thread_id: impl Into<String>,
        round: u32,
        index: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: ids::participant_message_id(&thread_id, round, index),
            thread_id,
            role: MessageRole::Assistant,
            round_number: Some(round),
            participant_index: Some(index),
            is_moderator: false,
            content: String::new(),
            finish_reason: FinishReason::Unknown,
            created_at: now,
        }
    }

    /// The round's moderator synthesis, created in-flight.
    pub fn moderator(thread_id: impl Into<String>, round: u32, now: DateTime<Utc>) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: ids::moderator_message_id(&thread_id, round),
            thread_id,
            role: MessageRole::Assistant,
            round_number: Some(round),
            participant_index: None,
            is_moderator: true,
            content: String::new(),
            finish_reason: FinishReason::Unknown,
            created_at: now,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = reason;
        self
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// A participant turn (assistant, not moderator).
    pub fn is_participant(&self) -> bool {
        self.role == MessageRole::Assistant && !self.is_moderator
    }

    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_is_terminal_on_creation() {
        let msg = Message::user("t1", 0, "hello", Utc::now());
        assert_eq!(msg.id, "t1_r0_user");
        assert!(msg.is_user());
        assert!(msg.is_terminal());
    }

    #[test]
    fn participant_message_starts_in_flight() {
        let msg = Message::participant("t1", 1, 2, Utc::now());
        assert_eq!(msg.id, "t1_r1_p2");
        assert!(msg.is_participant());
        assert!(!msg.is_terminal());
        assert_eq!(msg.participant_index, Some(2));
    }

    #[test]
    fn moderator_message_is_not_a_participant() {
        let msg = Message::moderator("t1", 0, Utc::now());
        assert_eq!(msg.id, "t1_r0_moderator");
        assert!(!msg.is_participant());
        assert!(msg.is_moderator);
        assert_eq!(msg.participant_index, None);
    }

    #[test]
    fn every_non_unknown_reason_is_terminal() {
        for reason in [
            FinishReason::Stop,
            FinishReason::Length,
            FinishReason::ContentFilter,
            FinishReason::Error,
        ] {
            assert!(reason.is_terminal(), "{reason:?}");
        }
        assert!(!FinishReason::Unknown.is_terminal());
    }
}
