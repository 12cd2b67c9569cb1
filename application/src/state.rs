//! Engine state aggregate
//!
//! Single source of truth for everything the round engine mutates. All
//! writes go through named transition methods; composite transitions (stop,
//! config commit, changelog clear) touch every affected field in one call so
//! no observer can see a torn intermediate state.

use roundtable_domain::{
    GuardKey, IdempotencyGuards, Message, Participant, StagedConfig, Thread,
};
use tracing::warn;

/// Central engine state — owned by the [`crate::use_cases::RoundEngine`]
pub struct EngineState {
    /// Committed thread configuration
    pub thread: Thread,
    /// Committed roster
    pub participants: Vec<Participant>,
    /// Message log cache, mirroring the persistence store
    pub messages: Vec<Message>,
    /// Staged configuration edits awaiting the next submission
    pub staged: Option<StagedConfig>,
    /// One-shot trigger guards
    pub guards: IdempotencyGuards,

    is_streaming: bool,
    current_participant_index: u32,
    waiting_for_changelog: bool,
    config_change_round: Option<u32>,
}

impl EngineState {
    pub fn new(thread: Thread, participants: Vec<Participant>) -> Self {
        Self {
            thread,
            participants,
            messages: Vec::new(),
            staged: None,
            guards: IdempotencyGuards::new(),
            is_streaming: false,
            current_participant_index: 0,
            waiting_for_changelog: false,
            config_change_round: None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn current_participant_index(&self) -> u32 {
        self.current_participant_index
    }

    pub fn waiting_for_changelog(&self) -> bool {
        self.waiting_for_changelog
    }

    pub fn config_change_round(&self) -> Option<u32> {
        self.config_change_round
    }

    // -- Staging --

    /// The staged configuration, started from the committed state on first
    /// access.
    pub fn staging_mut(&mut self) -> &mut StagedConfig {
        self.staged
            .get_or_insert_with(|| StagedConfig::from_committed(&self.thread, &self.participants))
    }

    /// Commit staged edits into the committed view and raise the changelog
    /// gate for `round` — both flags in one transition. With
    /// `has_changes == false` the staging is dropped and no gate is raised.
    pub fn commit_staging(&mut self, round: u32, has_changes: bool) {
        if let Some(staged) = self.staged.take() {
            self.thread.mode = staged.mode;
            self.thread.enable_web_search = staged.enable_web_search;
            self.participants = staged.participants;
        }
        if has_changes {
            self.waiting_for_changelog = true;
            self.config_change_round = Some(round);
        }
    }

    /// Clear both changelog-gate flags together.
    pub fn clear_changelog_wait(&mut self) {
        self.waiting_for_changelog = false;
        self.config_change_round = None;
    }

    /// The config-change gate: progress is blocked iff **both** flags are
    /// set. A lone flag never blocks (see [`Self::self_heal_flags`]).
    pub fn changelog_gate_blocked(&self) -> bool {
        self.waiting_for_changelog && self.config_change_round.is_some()
    }

    /// Rehydrate externally persisted flag state, e.g. after a reload.
    /// Callers should follow up with [`Self::self_heal_flags`].
    pub fn restore_changelog_flags(&mut self, waiting: bool, round: Option<u32>) {
        self.waiting_for_changelog = waiting;
        self.config_change_round = round;
    }

    /// Detect and clear a lone changelog flag. Exactly one flag set is an
    /// inconsistent state that must never gate progress; the fix is to drop
    /// the lone flag, not to wait it out. Returns true if a repair happened.
    pub fn self_heal_flags(&mut self) -> bool {
        match (self.waiting_for_changelog, self.config_change_round) {
            (true, None) => {
                warn!("waiting_for_changelog set without a round; clearing");
                self.waiting_for_changelog = false;
                true
            }
            (false, Some(round)) => {
                warn!(round, "config_change_round set without waiting flag; clearing");
                self.config_change_round = None;
                true
            }
            _ => false,
        }
    }

    // -- Streaming --

    /// Mark a participant turn as the active stream: flag and index move
    /// together.
    pub fn begin_turn(&mut self, participant_index: u32) {
        self.is_streaming = true;
        self.current_participant_index = participant_index;
    }

    /// Accept a completed turn only if the engine is still streaming.
    /// A completion arriving after a stop is discarded, not buffered. A
    /// cached placeholder with the same id (hydrated from the store before a
    /// resume) is replaced, never duplicated.
    pub fn accept_turn(&mut self, message: Message) -> bool {
        if !self.is_streaming {
            warn!(id = %message.id, "discarding turn completion after stop");
            return false;
        }
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message;
        } else {
            self.messages.push(message);
        }
        true
    }

    /// Stop streaming: flag false and index reset in a single transition —
    /// never observable as "not streaming but mid-roster".
    pub fn apply_stop(&mut self) {
        self.is_streaming = false;
        self.current_participant_index = 0;
    }

    /// Append a message outside the streaming path (user prompt, moderator
    /// record mirrored from the store).
    pub fn record_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop the round's assistant and moderator messages from the cache
    /// (regeneration). The user message stays.
    pub fn purge_round_outputs(&mut self, round: u32) {
        self.messages
            .retain(|m| m.round_number != Some(round) || m.is_user());
    }

    /// Re-arm the round's one-shot triggers (regeneration path).
    pub fn rearm_round(&mut self, round: u32) {
        self.guards.release(&GuardKey::Moderation { round });
        self.guards.release(&GuardKey::PreSearch { round });
        self.guards.release(&GuardKey::Submit { round });
        self.guards.release(&GuardKey::Stop { round });
    }
}
