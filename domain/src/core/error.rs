//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Participant {0} not found")]
    ParticipantNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
