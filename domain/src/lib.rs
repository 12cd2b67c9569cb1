//! Domain layer for roundtable
//!
//! This crate contains the orchestration state machine's core logic: round
//! arithmetic, turn sequencing, the pre-search and moderation state
//! machines, configuration staging, stream resumption, and the idempotency
//! guards that make every one-shot trigger safe under re-entrant calls.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Round
//!
//! One full cycle: a user prompt, every enabled participant's response in
//! priority order, then one moderator synthesis. Rounds are 0-indexed in
//! storage and 1-indexed anywhere a human sees them.
//!
//! ## Committed vs. staged configuration
//!
//! The participant roster, mode, and web-search flag are only ever mutated
//! through a commit that happens atomically with a message submission.
//! Edits in between live in [`thread::StagedConfig`].

pub mod analysis;
pub mod changelog;
pub mod core;
pub mod guard;
pub mod message;
pub mod presearch;
pub mod resumption;
pub mod round;
pub mod thread;

// Re-export commonly used types
pub use analysis::{Analysis, AnalysisStatus};
pub use changelog::{ChangeType, ChangelogEntry, ConfigChange, summarize};
pub use core::{error::DomainError, ids};
pub use guard::{GuardKey, IdempotencyGuards};
pub use message::{
    FinishReason, Message, MessageRole, RoundMessages, current_round, display_round,
    group_by_round, next_round,
};
pub use presearch::{PreSearch, PreSearchStatus};
pub use resumption::{StreamResumptionState, StreamStatus};
pub use round::{
    completion::{expected_participant_ids, round_complete},
    sequencer::{generation_context, round_roster},
};
pub use thread::{
    ConversationMode, Participant, StagedConfig, Thread, ThreadStatus, diff_config,
    normalize_priorities,
};
