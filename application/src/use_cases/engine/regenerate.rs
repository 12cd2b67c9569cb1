//! Round regeneration.
//!
//! Regeneration discards the latest round's outputs and re-runs it against
//! the same user prompt and the same committed configuration. The user
//! message and any pre-search record survive; everything downstream of them
//! is rebuilt, and the round's one-shot triggers are re-armed so the re-run
//! can fire them again.

use super::{EngineError, RoundEngine, SubmitOutcome};
use crate::ports::{
    ChangelogQuery, ModelGateway, ResumptionStore, RoundProgress, ThreadStore, active_key,
};
use roundtable_domain::current_round;
use tracing::info;

impl<G, S, R, C> RoundEngine<G, S, R, C>
where
    G: ModelGateway,
    S: ThreadStore,
    R: ResumptionStore,
    C: ChangelogQuery,
{
    /// Re-run the most recent round from its existing user message.
    pub async fn regenerate(
        &self,
        progress: &dyn RoundProgress,
    ) -> Result<SubmitOutcome, EngineError> {
        let (thread_id, round) = {
            let st = self.state();
            if st.is_streaming() {
                return Err(EngineError::RoundInFlight);
            }
            let Some(round) = current_round(&st.messages) else {
                return Err(EngineError::NothingToRegenerate);
            };
            (st.thread.id.clone(), round)
        };

        let deleted = self.store.delete_round_outputs(&thread_id, round).await?;
        {
            let mut st = self.state();
            st.purge_round_outputs(round);
            st.rearm_round(round);
        }
        self.resumption.delete(&active_key(&thread_id)).await?;
        info!(round, deleted, "round outputs discarded for regeneration");

        let roster = self.roster();
        if roster.is_empty() {
            return Err(EngineError::NoParticipants);
        }
        progress.on_round_start(round, roster.len());

        // the original pre-search result is reused, not refetched; if one is
        // still non-terminal we wait it out like any other caller
        self.await_presearch_terminal(round).await?;
        self.run_round_body(round, &roster, None, progress).await
    }
}
