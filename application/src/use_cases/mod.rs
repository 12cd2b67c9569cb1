//! Use cases driving the round engine.

pub mod engine;

pub use engine::{EngineError, ResumeAction, RoundEngine, SubmitOutcome};
