//! Infrastructure layer for roundtable
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer, plus configuration file loading.

pub mod config;
pub mod gateway;
pub mod persistence;
pub mod resumption;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use gateway::ScriptedGateway;
pub use persistence::InMemoryThreadStore;
pub use resumption::{FileResumptionStore, InMemoryResumptionStore};
