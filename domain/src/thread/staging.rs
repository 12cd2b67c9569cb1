//! Staged configuration edits.
//!
//! User edits to the participant roster, conversation mode, or web-search
//! flag are held here and only become the committed configuration when the
//! next message is submitted. Until then the running round keeps seeing the
//! committed state. The diff between the two views yields the changelog
//! entries for the round the commit lands in.

use super::entities::{ConversationMode, Thread};
use super::participant::{Participant, normalize_priorities};
use crate::changelog::ConfigChange;
use crate::core::error::DomainError;

/// The full desired configuration, as edited but not yet committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedConfig {
    /// Desired roster; priorities renormalized on every edit
    pub participants: Vec<Participant>,
    pub mode: ConversationMode,
    pub enable_web_search: bool,
}

impl StagedConfig {
    /// Start staging from the committed state.
    pub fn from_committed(thread: &Thread, participants: &[Participant]) -> Self {
        Self {
            participants: participants.to_vec(),
            mode: thread.mode,
            enable_web_search: thread.enable_web_search,
        }
    }

    pub fn add_participant(&mut self, participant: Participant) {
        self.participants.push(participant);
        normalize_priorities(&mut self.participants);
    }

    pub fn remove_participant(&mut self, participant_id: &str) {
        self.participants.retain(|p| p.id != participant_id);
        normalize_priorities(&mut self.participants);
    }

    pub fn set_role(
        &mut self,
        participant_id: &str,
        role: Option<String>,
    ) -> Result<(), DomainError> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.id == participant_id)
            .ok_or_else(|| DomainError::ParticipantNotFound(participant_id.to_string()))?;
        participant.role = role;
        Ok(())
    }

    /// Reorder to the given id sequence; ids not listed keep their relative
    /// order after the listed ones.
    pub fn reorder(&mut self, order: &[String]) {
        for participant in self.participants.iter_mut() {
            participant.priority = order
                .iter()
                .position(|id| *id == participant.id)
                .map(|i| i as u32)
                .unwrap_or(order.len() as u32 + participant.priority);
        }
        normalize_priorities(&mut self.participants);
    }

    pub fn set_mode(&mut self, mode: ConversationMode) {
        self.mode = mode;
    }

    pub fn set_web_search(&mut self, enabled: bool) {
        self.enable_web_search = enabled;
    }
}

/// Diff committed configuration against a staged one.
///
/// Produces one [`ConfigChange`] per logical change. A reorder is reported
/// once (with the final id order) and only when the surviving participants'
/// relative order actually changed, so removals alone don't double-report.
pub fn diff_config(
    thread: &Thread,
    committed: &[Participant],
    staged: &StagedConfig,
) -> Vec<ConfigChange> {
    let mut changes = Vec::new();

    for p in &staged.participants {
        if !committed.iter().any(|c| c.id == p.id) {
            changes.push(ConfigChange::ParticipantAdded {
                participant_id: p.id.clone(),
                model_id: p.model_id.clone(),
            });
        }
    }

    for c in committed {
        if !staged.participants.iter().any(|p| p.id == c.id) {
            changes.push(ConfigChange::ParticipantRemoved {
                participant_id: c.id.clone(),
                model_id: c.model_id.clone(),
            });
        }
    }

    for p in &staged.participants {
        if let Some(c) = committed.iter().find(|c| c.id == p.id)
            && c.role != p.role
        {
            changes.push(ConfigChange::RoleChanged {
                participant_id: p.id.clone(),
                role: p.role.clone(),
            });
        }
    }

    if surviving_order(committed, staged) != surviving_order_staged(committed, staged) {
        let mut order: Vec<&Participant> = staged.participants.iter().collect();
        order.sort_by_key(|p| p.priority);
        changes.push(ConfigChange::ParticipantsReordered {
            order: order.into_iter().map(|p| p.id.clone()).collect(),
        });
    }

    if thread.mode != staged.mode {
        changes.push(ConfigChange::ModeChanged {
            from: thread.mode,
            to: staged.mode,
        });
    }

    if thread.enable_web_search != staged.enable_web_search {
        changes.push(ConfigChange::WebSearchToggled {
            enabled: staged.enable_web_search,
        });
    }

    changes
}

/// Ids present in both views, in committed priority order.
fn surviving_order(committed: &[Participant], staged: &StagedConfig) -> Vec<String> {
    let mut sorted: Vec<&Participant> = committed
        .iter()
        .filter(|c| staged.participants.iter().any(|p| p.id == c.id))
        .collect();
    sorted.sort_by_key(|p| p.priority);
    sorted.into_iter().map(|p| p.id.clone()).collect()
}

/// Ids present in both views, in staged priority order.
fn surviving_order_staged(committed: &[Participant], staged: &StagedConfig) -> Vec<String> {
    let mut sorted: Vec<&Participant> = staged
        .participants
        .iter()
        .filter(|p| committed.iter().any(|c| c.id == p.id))
        .collect();
    sorted.sort_by_key(|p| p.priority);
    sorted.into_iter().map(|p| p.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeType;
    use chrono::Utc;

    fn thread() -> Thread {
        Thread::new("t1", "test", Utc::now())
    }

    fn committed() -> Vec<Participant> {
        vec![
            Participant::new("p0", "model-a", 0),
            Participant::new("p1", "model-b", 1),
            Participant::new("p2", "model-c", 2),
        ]
    }

    #[test]
    fn no_edits_no_changes() {
        let thread = thread();
        let committed = committed();
        let staged = StagedConfig::from_committed(&thread, &committed);
        assert!(diff_config(&thread, &committed, &staged).is_empty());
    }

    #[test]
    fn add_and_remove_report_separately() {
        let thread = thread();
        let committed = committed();
        let mut staged = StagedConfig::from_committed(&thread, &committed);
        staged.remove_participant("p2");
        staged.add_participant(Participant::new("p3", "model-d", 99));

        let changes = diff_config(&thread, &committed, &staged);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().any(|c| matches!(
            c,
            ConfigChange::ParticipantAdded { participant_id, .. } if participant_id == "p3"
        )));
        assert!(changes.iter().any(|c| matches!(
            c,
            ConfigChange::ParticipantRemoved { participant_id, .. } if participant_id == "p2"
        )));
        // Removal alone must not count as a reorder
        assert!(
            !changes
                .iter()
                .any(|c| matches!(c, ConfigChange::ParticipantsReordered { .. }))
        );
    }

    #[test]
    fn reorder_reports_final_order_once() {
        let thread = thread();
        let committed = committed();
        let mut staged = StagedConfig::from_committed(&thread, &committed);
        staged.reorder(&["p2".to_string(), "p0".to_string(), "p1".to_string()]);

        let priorities: Vec<(String, u32)> = staged
            .participants
            .iter()
            .map(|p| (p.id.clone(), p.priority))
            .collect();
        assert!(priorities.contains(&("p2".to_string(), 0)));
        assert!(priorities.contains(&("p0".to_string(), 1)));
        assert!(priorities.contains(&("p1".to_string(), 2)));

        let changes = diff_config(&thread, &committed, &staged);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            ConfigChange::ParticipantsReordered { order } => {
                assert_eq!(order, &["p2", "p0", "p1"]);
            }
            other => panic!("expected reorder, got {other:?}"),
        }
    }

    #[test]
    fn combined_edits_yield_one_change_each() {
        let thread = thread();
        let committed = committed();
        let mut staged = StagedConfig::from_committed(&thread, &committed);
        staged.remove_participant("p1");
        staged.add_participant(Participant::new("p3", "model-d", 99));
        staged.set_role("p0", Some("skeptic".to_string())).unwrap();
        staged.set_mode(ConversationMode::Debating);
        staged.set_web_search(true);

        let changes = diff_config(&thread, &committed, &staged);
        let types: Vec<ChangeType> = changes.iter().map(|c| c.change_type()).collect();
        assert_eq!(types.iter().filter(|t| **t == ChangeType::Added).count(), 1);
        assert_eq!(types.iter().filter(|t| **t == ChangeType::Removed).count(), 1);
        assert_eq!(types.iter().filter(|t| **t == ChangeType::Modified).count(), 3);
    }

    #[test]
    fn set_role_on_unknown_participant_errors() {
        let thread = thread();
        let committed = committed();
        let mut staged = StagedConfig::from_committed(&thread, &committed);
        let err = staged.set_role("p9", Some("skeptic".to_string())).unwrap_err();
        assert!(matches!(err, DomainError::ParticipantNotFound(id) if id == "p9"));
    }

    #[test]
    fn priorities_stay_contiguous_through_edits() {
        let thread = thread();
        let committed = committed();
        let mut staged = StagedConfig::from_committed(&thread, &committed);
        staged.remove_participant("p0");
        staged.add_participant(Participant::new("p3", "model-d", 50));
        staged.remove_participant("p2");

        let mut priorities: Vec<u32> = staged.participants.iter().map(|p| p.priority).collect();
        priorities.sort_unstable();
        assert_eq!(priorities, vec![0, 1]);
    }
}
