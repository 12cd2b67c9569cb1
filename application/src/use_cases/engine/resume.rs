//! Stream resumption.
//!
//! After a reload the engine inspects the thread's active-round record and
//! computes the single next action: re-stream a participant, run the missing
//! moderation, or nothing. The computation is pure and repeatable; only the
//! execution is guarded.

use super::{EngineError, RoundEngine, SubmitOutcome};
use crate::ports::{
    ChangelogQuery, ModelGateway, ResumptionStore, RoundProgress, ThreadStore, active_key,
};
use chrono::{DateTime, Utc};
use roundtable_domain::{GuardKey, Message, StreamResumptionState, ids};
use tracing::{debug, info};

/// What a reconnecting client should do next for a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    /// Nothing to resume: no record, a stale record, or a finished round
    None,
    /// Re-stream this participant's turn and continue the round from there
    StreamParticipant { round: u32, participant_index: u32 },
    /// All turns are terminal but moderation never ran
    Moderate { round: u32 },
}

/// Compute the next action from a resumption record and the message log.
///
/// A terminal moderator message is authoritative: it means the round really
/// finished, even if the record still carries a `moderation_failed` flag or
/// was never cleaned up.
pub fn next_action(
    record: Option<&StreamResumptionState>,
    messages: &[Message],
    now: DateTime<Utc>,
    max_age: chrono::Duration,
) -> ResumeAction {
    let Some(record) = record else {
        return ResumeAction::None;
    };
    if record.is_stale(now, max_age) {
        return ResumeAction::None;
    }
    if let Some(index) = record.next_to_stream() {
        return ResumeAction::StreamParticipant {
            round: record.round_number,
            participant_index: index,
        };
    }
    let moderator_id = ids::moderator_message_id(&record.thread_id, record.round_number);
    let moderator_done = messages
        .iter()
        .any(|m| m.id == moderator_id && m.is_terminal());
    if moderator_done || record.moderation_failed {
        return ResumeAction::None;
    }
    ResumeAction::Moderate {
        round: record.round_number,
    }
}

impl<G, S, R, C> RoundEngine<G, S, R, C>
where
    G: ModelGateway,
    S: ThreadStore,
    R: ResumptionStore,
    C: ChangelogQuery,
{
    /// Inspect the thread's active-round record and report what a resume
    /// would do, without executing anything.
    pub async fn resume_action(&self) -> Result<ResumeAction, EngineError> {
        let thread_id = self.state().thread.id.clone();
        let record = self.resumption.get(&active_key(&thread_id)).await?;
        let messages = self.store.messages(&thread_id).await?;
        Ok(next_action(
            record.as_ref(),
            &messages,
            Utc::now(),
            self.policy.resumption_stale(),
        ))
    }

    /// Resume the thread's interrupted round, if any. Returns `None` when
    /// there is nothing to resume or another caller already claimed the
    /// resume for this position.
    pub async fn resume(
        &self,
        progress: &dyn RoundProgress,
    ) -> Result<Option<SubmitOutcome>, EngineError> {
        let thread_id = self.state().thread.id.clone();
        let record = self.resumption.get(&active_key(&thread_id)).await?;
        let messages = self.store.messages(&thread_id).await?;
        let action = next_action(
            record.as_ref(),
            &messages,
            Utc::now(),
            self.policy.resumption_stale(),
        );
        self.state().messages = messages;

        match action {
            ResumeAction::None => {
                // finished or unusable record: drop the anchor so the next
                // inspection is a fast miss
                if record.is_some() {
                    self.resumption.delete(&active_key(&thread_id)).await?;
                }
                debug!("nothing to resume");
                Ok(None)
            }
            ResumeAction::StreamParticipant {
                round,
                participant_index,
            } => {
                let claimed = self.state().guards.try_mark(GuardKey::Resume {
                    round,
                    participant_index,
                });
                if !claimed {
                    debug!(round, participant_index, "duplicate resume ignored");
                    return Ok(None);
                }
                let roster = self.roster();
                if roster.is_empty() {
                    return Err(EngineError::NoParticipants);
                }
                info!(round, participant_index, "resuming round mid-stream");
                let outcome = self.run_round_body(round, &roster, record, progress).await?;
                Ok(Some(outcome))
            }
            ResumeAction::Moderate { round } => {
                info!(round, "resuming round at moderation");
                let roster = self.roster();
                self.maybe_moderate(round, &roster, progress).await?;
                self.close_round().await?;
                progress.on_round_complete(round);
                Ok(Some(SubmitOutcome::Completed { round }))
            }
        }
    }
}
