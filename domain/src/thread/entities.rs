//! Thread domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Interaction style applied to every round of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationMode {
    /// Participants examine the prompt from independent angles
    #[default]
    Analyzing,
    /// Participants build on each other's ideas
    Brainstorming,
    /// Participants argue opposing positions
    Debating,
    /// Participants work toward a single concrete answer
    Solving,
}

impl ConversationMode {
    pub fn as_str(&self) -> &str {
        match self {
            ConversationMode::Analyzing => "analyzing",
            ConversationMode::Brainstorming => "brainstorming",
            ConversationMode::Debating => "debating",
            ConversationMode::Solving => "solving",
        }
    }
}

impl std::fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConversationMode {
    type Err = crate::core::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "analyzing" => Ok(ConversationMode::Analyzing),
            "brainstorming" => Ok(ConversationMode::Brainstorming),
            "debating" => Ok(ConversationMode::Debating),
            "solving" => Ok(ConversationMode::Solving),
            other => Err(crate::core::error::DomainError::InvalidConfiguration(
                format!("Unknown conversation mode: {other}"),
            )),
        }
    }
}

/// Lifecycle status of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Active,
    Archived,
}

/// A multi-participant conversation (Entity)
///
/// Mutated only through committed configuration changes; mid-round edits
/// live in [`super::staging::StagedConfig`] until the next submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub mode: ConversationMode,
    pub enable_web_search: bool,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        let title = title.into();
        let slug = slugify(&title);
        Self {
            id: id.into(),
            title,
            slug,
            mode: ConversationMode::default(),
            enable_web_search: false,
            status: ThreadStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_mode(mut self, mode: ConversationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.enable_web_search = enabled;
        self
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
