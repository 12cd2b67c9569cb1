//! Moderation trigger.
//!
//! Moderation fires at most once per round, and only once the round is
//! actually complete: every expected participant turn terminal, nothing
//! streaming. The completeness check and the trigger are separated so the
//! check can run on every turn completion without risking a double fire.

use super::{EngineError, RoundEngine};
use crate::ports::{
    ChangelogQuery, MessagePatch, ModelGateway, ModerationRequest, ResumptionStore, RoundProgress,
    ThreadStore, TurnOutcome, active_key,
};
use chrono::Utc;
use roundtable_domain::{
    Analysis, AnalysisStatus, FinishReason, GuardKey, Message, Participant,
    expected_participant_ids, round_complete,
};
use tracing::{debug, info, warn};

impl<G, S, R, C> RoundEngine<G, S, R, C>
where
    G: ModelGateway,
    S: ThreadStore,
    R: ResumptionStore,
    C: ChangelogQuery,
{
    /// Fire the round's moderation synthesis if the round is complete and
    /// moderation has not fired yet. Safe to call any number of times.
    pub(super) async fn maybe_moderate(
        &self,
        round: u32,
        roster: &[Participant],
        progress: &dyn RoundProgress,
    ) -> Result<(), EngineError> {
        let (thread_id, sources) = {
            let st = self.state();
            let thread_id = st.thread.id.clone();
            let expected = expected_participant_ids(&thread_id, round, roster.len() as u32);
            if !round_complete(&st.messages, round, &expected, st.is_streaming()) {
                debug!(round, "round not complete; moderation not triggered");
                return Ok(());
            }
            let sources: Vec<Message> = st
                .messages
                .iter()
                .filter(|m| m.round_number == Some(round) && m.is_participant() && m.is_terminal())
                .cloned()
                .collect();
            (thread_id, sources)
        };

        if !self.state().guards.try_mark(GuardKey::Moderation { round }) {
            debug!(round, "moderation already triggered for this round");
            return Ok(());
        }

        // the lead participant doubles as moderator
        let Some(moderator) = roster.first() else {
            return Ok(());
        };
        info!(round, model = %moderator.model_id, "moderation started");
        progress.on_moderation_start(round);

        let placeholder = Message::moderator(&thread_id, round, Utc::now());
        let message_id = placeholder.id.clone();
        self.store.create_message(&placeholder).await?;

        let request = ModerationRequest {
            thread_id: thread_id.clone(),
            round,
            model_id: moderator.model_id.clone(),
            source_messages: sources.clone(),
        };
        let outcome = match self.gateway.start_moderation(request).await {
            Ok(handle) => handle.collect().await,
            Err(e) => {
                warn!(round, error = %e, "moderation failed to start");
                TurnOutcome {
                    text: String::new(),
                    finish_reason: FinishReason::Error,
                    error: Some(e.to_string()),
                }
            }
        };

        self.store
            .patch_message(
                &message_id,
                MessagePatch {
                    content: Some(outcome.text.clone()),
                    finish_reason: Some(outcome.finish_reason),
                },
            )
            .await?;
        self.state().record_message(
            placeholder
                .with_content(outcome.text.clone())
                .with_finish_reason(outcome.finish_reason),
        );

        let source_ids: Vec<String> = sources.into_iter().map(|m| m.id).collect();
        let analysis = Analysis::new(&thread_id, round, source_ids, Utc::now());
        let analysis = if outcome.finish_reason == FinishReason::Error {
            analysis.with_status(AnalysisStatus::Failed)
        } else {
            analysis
                .with_status(AnalysisStatus::Complete)
                .with_payload(serde_json::json!({ "synthesis": outcome.text }))
        };
        self.store.create_analysis(&analysis).await?;

        if outcome.finish_reason == FinishReason::Error {
            // terminal for the round: resumption remembers the failure so a
            // reconnect does not retry moderation
            warn!(round, error = ?outcome.error, "moderation failed");
            if let Some(mut record) = self.resumption.get(&active_key(&thread_id)).await? {
                record.mark_moderation_failed(Utc::now());
                self.resumption.set(&active_key(&thread_id), &record).await?;
            }
        } else {
            info!(round, "moderation complete");
        }
        Ok(())
    }
}
