//! Application layer for roundtable
//!
//! Home of the round engine: the use case that takes a user submission
//! through configuration commit, changelog sync, pre-search, serial
//! participant streaming, and moderation. The engine talks to the outside
//! world only through the ports defined here; adapters live in the
//! infrastructure layer.

pub mod config;
pub mod ports;
pub mod state;
pub mod use_cases;

pub use config::OrchestratorPolicy;
pub use state::EngineState;
pub use use_cases::{EngineError, ResumeAction, RoundEngine, SubmitOutcome};
