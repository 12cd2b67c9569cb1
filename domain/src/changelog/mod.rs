//! Changelog entries describing committed configuration changes.
//!
//! One entry is recorded per logical change, attributed to the round the
//! change takes effect in. Entries are append-only.

use crate::thread::entities::ConversationMode;
use serde::{Deserialize, Serialize};

/// Coarse classification of a configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl ChangeType {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
        }
    }
}

/// Structured payload of one logical configuration change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigChange {
    ParticipantAdded {
        participant_id: String,
        model_id: String,
    },
    ParticipantRemoved {
        participant_id: String,
        model_id: String,
    },
    RoleChanged {
        participant_id: String,
        role: Option<String>,
    },
    ParticipantsReordered {
        order: Vec<String>,
    },
    ModeChanged {
        from: ConversationMode,
        to: ConversationMode,
    },
    WebSearchToggled {
        enabled: bool,
    },
}

impl ConfigChange {
    pub fn change_type(&self) -> ChangeType {
        match self {
            ConfigChange::ParticipantAdded { .. } => ChangeType::Added,
            ConfigChange::ParticipantRemoved { .. } => ChangeType::Removed,
            ConfigChange::RoleChanged { .. }
            | ConfigChange::ParticipantsReordered { .. }
            | ConfigChange::ModeChanged { .. }
            | ConfigChange::WebSearchToggled { .. } => ChangeType::Modified,
        }
    }

    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        match self {
            ConfigChange::ParticipantAdded { model_id, .. } => {
                format!("Added participant {model_id}")
            }
            ConfigChange::ParticipantRemoved { model_id, .. } => {
                format!("Removed participant {model_id}")
            }
            ConfigChange::RoleChanged { participant_id, role } => match role {
                Some(role) => format!("Set role of {participant_id} to {role}"),
                None => format!("Cleared role of {participant_id}"),
            },
            ConfigChange::ParticipantsReordered { order } => {
                format!("Reordered {} participants", order.len())
            }
            ConfigChange::ModeChanged { from, to } => {
                format!("Switched mode from {from} to {to}")
            }
            ConfigChange::WebSearchToggled { enabled } => {
                if *enabled {
                    "Enabled web search".to_string()
                } else {
                    "Disabled web search".to_string()
                }
            }
        }
    }
}

/// A recorded configuration change (Entity, append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub id: String,
    pub thread_id: String,
    /// Round the change takes effect in (0-based)
    pub round_number: u32,
    pub change_type: ChangeType,
    pub summary: String,
    pub change: ConfigChange,
}

impl ChangelogEntry {
    pub fn from_change(thread_id: impl Into<String>, round: u32, change: ConfigChange) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: format!("{thread_id}_r{round}_cl_{}", change_id_fragment(&change)),
            thread_id,
            round_number: round,
            change_type: change.change_type(),
            summary: change.summary(),
            change,
        }
    }
}

fn change_id_fragment(change: &ConfigChange) -> String {
    match change {
        ConfigChange::ParticipantAdded { participant_id, .. } => format!("add_{participant_id}"),
        ConfigChange::ParticipantRemoved { participant_id, .. } => format!("rm_{participant_id}"),
        ConfigChange::RoleChanged { participant_id, .. } => format!("role_{participant_id}"),
        ConfigChange::ParticipantsReordered { .. } => "reorder".to_string(),
        ConfigChange::ModeChanged { .. } => "mode".to_string(),
        ConfigChange::WebSearchToggled { .. } => "websearch".to_string(),
    }
}

/// Count entries per change type, e.g. "2 added, 1 removed, 1 modified".
pub fn summarize(entries: &[ChangelogEntry]) -> String {
    let mut added = 0usize;
    let mut removed = 0usize;
    let mut modified = 0usize;
    for entry in entries {
        match entry.change_type {
            ChangeType::Added => added += 1,
            ChangeType::Removed => removed += 1,
            ChangeType::Modified => modified += 1,
        }
    }
    let mut parts = Vec::new();
    if added > 0 {
        parts.push(format!("{added} added"));
    }
    if removed > 0 {
        parts.push(format!("{removed} removed"));
    }
    if modified > 0 {
        parts.push(format!("{modified} modified"));
    }
    if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    }
}
