//! Persistence port
//!
//! Create/patch operations for every per-thread record, keyed by thread id
//! and round number. Patch responses report whether anything actually
//! changed (`has_any_changes`); configuration sync uses that to decide
//! whether a changelog wait is needed at all.

use async_trait::async_trait;
use roundtable_domain::{
    Analysis, ChangelogEntry, ConversationMode, FinishReason, Message, Participant, PreSearch,
    PreSearchStatus, Thread,
};
use thiserror::Error;

/// Errors from the persistence service
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Whether a patch changed anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOutcome {
    pub has_any_changes: bool,
}

impl PatchOutcome {
    pub fn changed() -> Self {
        Self { has_any_changes: true }
    }

    pub fn unchanged() -> Self {
        Self { has_any_changes: false }
    }
}

/// Partial update of a thread's committed configuration
#[derive(Debug, Clone, Default)]
pub struct ThreadPatch {
    pub mode: Option<ConversationMode>,
    pub enable_web_search: Option<bool>,
    pub title: Option<String>,
}

/// Partial update of a message
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

/// The persistence service the engine drives
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn create_thread(&self, thread: &Thread) -> Result<(), StoreError>;
    async fn thread(&self, thread_id: &str) -> Result<Thread, StoreError>;
    async fn patch_thread(
        &self,
        thread_id: &str,
        patch: ThreadPatch,
    ) -> Result<PatchOutcome, StoreError>;

    /// Replace the committed roster wholesale. Reports whether the roster
    /// actually differed.
    async fn replace_participants(
        &self,
        thread_id: &str,
        roster: &[Participant],
    ) -> Result<PatchOutcome, StoreError>;
    async fn participants(&self, thread_id: &str) -> Result<Vec<Participant>, StoreError>;

    async fn create_message(&self, message: &Message) -> Result<(), StoreError>;
    async fn patch_message(
        &self,
        message_id: &str,
        patch: MessagePatch,
    ) -> Result<PatchOutcome, StoreError>;
    async fn messages(&self, thread_id: &str) -> Result<Vec<Message>, StoreError>;

    /// Create the round's pre-search record. At most one per round; a second
    /// create for the same round is a conflict.
    async fn create_presearch(&self, presearch: &PreSearch) -> Result<(), StoreError>;
    /// Advance a pre-search status. Implementations must refuse downgrades
    /// (terminal states win) and report the refusal as an unchanged patch.
    async fn patch_presearch(
        &self,
        thread_id: &str,
        round: u32,
        status: PreSearchStatus,
        result: Option<serde_json::Value>,
        forced: bool,
    ) -> Result<PatchOutcome, StoreError>;
    async fn presearch(&self, thread_id: &str, round: u32)
    -> Result<Option<PreSearch>, StoreError>;

    async fn create_analysis(&self, analysis: &Analysis) -> Result<(), StoreError>;
    async fn analysis(&self, thread_id: &str, round: u32) -> Result<Option<Analysis>, StoreError>;

    async fn append_changelog(&self, entries: &[ChangelogEntry]) -> Result<(), StoreError>;

    /// Regeneration cleanup: delete the round's assistant and moderator
    /// messages and its analysis record. The user message and any
    /// pre-search record stay. Returns how many records were deleted.
    async fn delete_round_outputs(&self, thread_id: &str, round: u32) -> Result<u32, StoreError>;
}
