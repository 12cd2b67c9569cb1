//! Per-round turn sequencing and completion detection.

pub mod completion;
pub mod sequencer;

pub use completion::round_complete;
pub use sequencer::{generation_context, round_roster};
