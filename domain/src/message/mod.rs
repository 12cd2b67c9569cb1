//! Messages and round arithmetic.

pub mod entities;
pub mod rounds;

pub use entities::{FinishReason, Message, MessageRole};
pub use rounds::{RoundMessages, current_round, display_round, group_by_round, next_round};
