//! Participants and turn-order priorities.
//!
//! `priority` is the only source of turn order. It is an explicit integer,
//! never inferred from array position, and is renormalized to a contiguous
//! `0..n-1` run after every structural change (add, remove, reorder).

use serde::{Deserialize, Serialize};

/// One configured AI model taking turns in a thread (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    /// Model reference, e.g. "gpt-5" or "claude-sonnet"
    pub model_id: String,
    /// Optional role label shown alongside responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// 0-based turn order within the thread, contiguous and unique
    pub priority: u32,
    pub is_enabled: bool,
}

impl Participant {
    pub fn new(id: impl Into<String>, model_id: impl Into<String>, priority: u32) -> Self {
        Self {
            id: id.into(),
            model_id: model_id.into(),
            role: None,
            priority,
            is_enabled: true,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

/// Reassign priorities as exactly `0..n-1` in the current priority order.
///
/// The sort is stable, so participants sharing a priority (possible after a
/// raw edit) keep their relative order. Call after any add/remove/reorder.
pub fn normalize_priorities(participants: &mut [Participant]) {
    participants.sort_by_key(|p| p.priority);
    for (i, participant) in participants.iter_mut().enumerate() {
        participant.priority = i as u32;
    }
}

/// The enabled participants of a roster in ascending priority order.
pub fn enabled_in_order(participants: &[Participant]) -> Vec<&Participant> {
    let mut enabled: Vec<&Participant> = participants.iter().filter(|p| p.is_enabled).collect();
    enabled.sort_by_key(|p| p.priority);
    enabled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Participant> {
        vec![
            Participant::new("p-a", "model-a", 0),
            Participant::new("p-b", "model-b", 1),
            Participant::new("p-c", "model-c", 2),
        ]
    }

    #[test]
    fn normalize_fills_gaps_after_removal() {
        let mut participants = roster();
        participants.remove(1);
        normalize_priorities(&mut participants);
        let priorities: Vec<u32> = participants.iter().map(|p| p.priority).collect();
        assert_eq!(priorities, vec![0, 1]);
        assert_eq!(participants[1].id, "p-c");
    }

    #[test]
    fn normalize_is_contiguous_after_reorder() {
        let mut participants = roster();
        // Move p-c to the front by giving it a raw priority below everyone
        participants[2].priority = 0;
        participants[0].priority = 5;
        normalize_priorities(&mut participants);
        let order: Vec<&str> = participants.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["p-c", "p-b", "p-a"]);
        let priorities: Vec<u32> = participants.iter().map(|p| p.priority).collect();
        assert_eq!(priorities, vec![0, 1, 2]);
    }

    #[test]
    fn normalize_handles_duplicates_stably() {
        let mut participants = roster();
        participants.push(Participant::new("p-d", "model-d", 1));
        normalize_priorities(&mut participants);
        let priorities: Vec<u32> = participants.iter().map(|p| p.priority).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3]);
        // p-b came before p-d in the input, both at priority 1
        assert_eq!(participants[1].id, "p-b");
        assert_eq!(participants[2].id, "p-d");
    }

    #[test]
    fn enabled_in_order_skips_disabled() {
        let mut participants = roster();
        participants[1].is_enabled = false;
        let enabled = enabled_in_order(&participants);
        let ids: Vec<&str> = enabled.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-a", "p-c"]);
    }
}
