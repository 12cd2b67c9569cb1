//! Round progress notification port
//!
//! Callback surface for anything observing a round as it runs. The default
//! no-op implementation keeps headless callers trivial.

use roundtable_domain::FinishReason;

/// Callbacks fired as a round advances
pub trait RoundProgress: Send + Sync {
    /// Called when a round begins, with the expected participant count
    fn on_round_start(&self, round: u32, total_participants: usize);

    /// Called when the round's pre-search starts
    fn on_presearch_start(&self, _round: u32) {}

    /// Called when the pre-search reaches a terminal state; `forced` marks
    /// a staleness force-completion rather than a real result
    fn on_presearch_done(&self, _round: u32, _forced: bool) {}

    /// Called when a participant's turn starts streaming
    fn on_turn_start(&self, round: u32, participant_index: u32, model_id: &str);

    /// Called for each text chunk of a participant's turn
    fn on_turn_chunk(&self, _participant_index: u32, _chunk: &str) {}

    /// Called when a participant's turn reaches a terminal state
    fn on_turn_complete(&self, round: u32, participant_index: u32, finish_reason: FinishReason);

    /// Called when moderation starts
    fn on_moderation_start(&self, _round: u32) {}

    /// Called when the round closes (moderation done or skipped)
    fn on_round_complete(&self, round: u32);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl RoundProgress for NoProgress {
    fn on_round_start(&self, _round: u32, _total_participants: usize) {}
    fn on_turn_start(&self, _round: u32, _participant_index: u32, _model_id: &str) {}
    fn on_turn_complete(&self, _round: u32, _participant_index: u32, _reason: FinishReason) {}
    fn on_round_complete(&self, _round: u32) {}
}
