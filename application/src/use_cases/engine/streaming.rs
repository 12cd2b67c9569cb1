//! Participant turn streaming.
//!
//! Turns are strictly serial: participant N+1's stream is not issued until
//! participant N reached a terminal state. Every transition is mirrored into
//! the durable resumption record before the stream starts, so a reload at
//! any point can recover the correct next action.

use super::{EngineError, RoundEngine};
use crate::ports::{
    ChangelogQuery, MessagePatch, ModelGateway, ResumptionStore, RoundProgress, StoreError,
    StreamEvent, ThreadStore, TurnOutcome, TurnRequest, active_key, stream_key,
};
use chrono::Utc;
use roundtable_domain::{
    FinishReason, Message, Participant, StreamResumptionState, StreamStatus, generation_context,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl<G, S, R, C> RoundEngine<G, S, R, C>
where
    G: ModelGateway,
    S: ThreadStore,
    R: ResumptionStore,
    C: ChangelogQuery,
{
    /// Stream every pending participant of the round in priority order.
    /// Returns true if a stop ended the round early.
    pub(super) async fn run_turns(
        &self,
        round: u32,
        roster: &[Participant],
        resume_from: Option<StreamResumptionState>,
        progress: &dyn RoundProgress,
        cancel: &CancellationToken,
    ) -> Result<bool, EngineError> {
        let thread_id = self.state().thread.id.clone();
        let mut record = resume_from.unwrap_or_else(|| {
            StreamResumptionState::new(&thread_id, round, roster.len() as u32, Utc::now())
        });
        self.resumption.set(&active_key(&thread_id), &record).await?;

        for (i, participant) in roster.iter().enumerate() {
            let index = i as u32;
            if matches!(
                record.statuses.get(&index),
                Some(StreamStatus::Completed | StreamStatus::Failed)
            ) {
                // resumed round: this turn is already terminal
                continue;
            }
            if cancel.is_cancelled() {
                return Ok(true);
            }

            self.state().begin_turn(index);
            progress.on_turn_start(round, index, &participant.model_id);
            debug!(round, index, model = %participant.model_id, "turn started");

            record.mark(index, StreamStatus::Active, Utc::now());
            self.resumption
                .set(&stream_key(&record.stream_id), &record)
                .await?;
            self.resumption.set(&active_key(&thread_id), &record).await?;

            let placeholder = Message::participant(&thread_id, round, index, Utc::now());
            let message_id = placeholder.id.clone();
            match self.store.create_message(&placeholder).await {
                Ok(()) => {}
                // a resumed turn finds its placeholder already persisted by
                // the interrupted run; reuse it
                Err(StoreError::Conflict(_)) => {
                    debug!(round, index, "placeholder already persisted; reusing it");
                }
                Err(e) => return Err(e.into()),
            }

            let history: Vec<Message> = {
                let st = self.state();
                generation_context(&st.messages, round, index)
                    .into_iter()
                    .cloned()
                    .collect()
            };
            let request = TurnRequest {
                thread_id: thread_id.clone(),
                round,
                participant_index: index,
                model_id: participant.model_id.clone(),
                role: participant.role.clone(),
                history,
            };

            let outcome = match self.gateway.start_turn(request).await {
                Ok(handle) => self.drain_turn(handle, index, progress, cancel).await,
                Err(e) => {
                    warn!(round, index, error = %e, "turn failed to start");
                    Some(TurnOutcome {
                        text: String::new(),
                        finish_reason: FinishReason::Error,
                        error: Some(e.to_string()),
                    })
                }
            };

            let Some(outcome) = outcome else {
                info!(round, index, "round stopped mid-turn");
                return Ok(true);
            };

            // re-read the streaming flag before applying the completion; a
            // response finishing after a stop is dropped, not buffered
            let message = placeholder
                .with_content(outcome.text.clone())
                .with_finish_reason(outcome.finish_reason);
            let accepted = self.state().accept_turn(message);
            if !accepted {
                return Ok(true);
            }

            self.store
                .patch_message(
                    &message_id,
                    MessagePatch {
                        content: Some(outcome.text),
                        finish_reason: Some(outcome.finish_reason),
                    },
                )
                .await?;

            let status = if outcome.finish_reason == FinishReason::Error {
                warn!(round, index, error = ?outcome.error, "turn ended with error; continuing");
                StreamStatus::Failed
            } else {
                StreamStatus::Completed
            };
            record.mark(index, status, Utc::now());
            self.resumption
                .set(&stream_key(&record.stream_id), &record)
                .await?;
            self.resumption.set(&active_key(&thread_id), &record).await?;
            progress.on_turn_complete(round, index, outcome.finish_reason);
        }

        // roster exhausted; streaming ends with the same atomic reset a
        // stop uses, so no observer sees "not streaming" with a live index
        self.state().apply_stop();
        Ok(false)
    }

    /// Drain one turn's stream to its terminal event, forwarding chunks to
    /// the progress surface. Returns `None` if the round was stopped first.
    async fn drain_turn(
        &self,
        mut handle: crate::ports::StreamHandle,
        index: u32,
        progress: &dyn RoundProgress,
        cancel: &CancellationToken,
    ) -> Option<TurnOutcome> {
        let mut text = String::new();
        loop {
            tokio::select! {
                event = handle.receiver.recv() => match event {
                    Some(StreamEvent::Delta(chunk)) => {
                        progress.on_turn_chunk(index, &chunk);
                        text.push_str(&chunk);
                    }
                    Some(StreamEvent::Completed { finish_reason }) => {
                        let finish_reason = if finish_reason.is_terminal() {
                            finish_reason
                        } else {
                            FinishReason::Stop
                        };
                        return Some(TurnOutcome { text, finish_reason, error: None });
                    }
                    Some(StreamEvent::Error(e)) => {
                        return Some(TurnOutcome {
                            text,
                            finish_reason: FinishReason::Error,
                            error: Some(e),
                        });
                    }
                    None => {
                        return Some(TurnOutcome {
                            text,
                            finish_reason: FinishReason::Error,
                            error: Some("stream closed before a terminal event".to_string()),
                        });
                    }
                },
                _ = cancel.cancelled() => return None,
            }
        }
    }
}
