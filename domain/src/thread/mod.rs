//! Thread configuration: the long-lived conversation and its participants.

pub mod entities;
pub mod participant;
pub mod staging;

pub use entities::{ConversationMode, Thread, ThreadStatus};
pub use participant::{Participant, normalize_priorities};
pub use staging::{StagedConfig, diff_config};
