//! Configuration file schema

use roundtable_application::OrchestratorPolicy;
use roundtable_domain::{ConversationMode, Participant, Thread};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors found while validating a loaded configuration
#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("No participants configured")]
    NoParticipants,

    #[error("Duplicate participant model: {0}")]
    DuplicateModel(String),
}

/// Top-level configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub thread: FileThreadConfig,

    /// Participant roster in turn order
    #[serde(default)]
    pub participants: Vec<FileParticipantConfig>,

    #[serde(default)]
    pub policy: OrchestratorPolicy,

    #[serde(default)]
    pub resumption: FileResumptionConfig,
}

/// The `[thread]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileThreadConfig {
    pub title: String,
    #[serde(default)]
    pub mode: ConversationMode,
    #[serde(default)]
    pub enable_web_search: bool,
}

impl Default for FileThreadConfig {
    fn default() -> Self {
        Self {
            title: "Roundtable".to_string(),
            mode: ConversationMode::default(),
            enable_web_search: false,
        }
    }
}

/// One `[[participants]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileParticipantConfig {
    /// Model reference, e.g. "gpt-5" or "claude-sonnet"
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// The `[resumption]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileResumptionConfig {
    /// File to persist resumption records in; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.participants.is_empty() {
            return Err(ConfigValidationError::NoParticipants);
        }
        for (i, p) in self.participants.iter().enumerate() {
            if self.participants[..i].iter().any(|q| q.model == p.model) {
                return Err(ConfigValidationError::DuplicateModel(p.model.clone()));
            }
        }
        Ok(())
    }

    /// Build the committed thread entity this file describes.
    pub fn thread(&self, id: impl Into<String>) -> Thread {
        Thread::new(id, &self.thread.title, chrono::Utc::now())
            .with_mode(self.thread.mode)
            .with_web_search(self.thread.enable_web_search)
    }

    /// Build the committed roster. Ids and priorities follow file order.
    pub fn roster(&self) -> Vec<Participant> {
        self.participants
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut participant =
                    Participant::new(format!("p{i}"), &p.model, i as u32);
                if let Some(role) = &p.role {
                    participant = participant.with_role(role);
                }
                if !p.enabled {
                    participant = participant.disabled();
                }
                participant
            })
            .collect()
    }
}
