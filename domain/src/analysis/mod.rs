//! Moderation analysis: the once-per-round synthesis record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a round's moderation synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Streaming,
    Complete,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Complete | AnalysisStatus::Failed)
    }
}

/// The moderation record for a round (Entity, created at most once)
///
/// Creation is guarded by the round's moderation idempotency key; this type
/// itself only carries the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: String,
    pub thread_id: String,
    pub round_number: u32,
    pub status: AnalysisStatus,
    /// Ids of the participant messages this analysis synthesizes
    pub source_message_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    pub fn new(
        thread_id: impl Into<String>,
        round: u32,
        source_message_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let thread_id = thread_id.into();
        Self {
            id: format!("{thread_id}_r{round}_analysis"),
            thread_id,
            round_number: round,
            status: AnalysisStatus::Pending,
            source_message_ids,
            payload: None,
            created_at: now,
        }
    }

    pub fn with_status(mut self, status: AnalysisStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_id_is_per_round() {
        let a = Analysis::new("t1", 3, vec!["t1_r3_p0".to_string()], Utc::now());
        assert_eq!(a.id, "t1_r3_analysis");
        assert_eq!(a.status, AnalysisStatus::Pending);
    }

    #[test]
    fn terminal_statuses() {
        assert!(AnalysisStatus::Complete.is_terminal());
        assert!(AnalysisStatus::Failed.is_terminal());
        assert!(!AnalysisStatus::Streaming.is_terminal());
        assert!(!AnalysisStatus::Pending.is_terminal());
    }
}
