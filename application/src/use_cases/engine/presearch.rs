//! Pre-search gating within the round engine.
//!
//! The round's participants may not start streaming while the round's
//! pre-search (if any) is non-terminal. A stream stuck past the staleness
//! window is force-completed: behaviorally identical to success, but logged
//! with `forced = true` so the two are distinguishable after the fact.

use super::{EngineError, RoundEngine};
use crate::ports::{ChangelogQuery, ModelGateway, ResumptionStore, RoundProgress, ThreadStore};
use chrono::Utc;
use roundtable_domain::{GuardKey, PreSearch, PreSearchStatus};
use tracing::{debug, info, warn};

impl<G, S, R, C> RoundEngine<G, S, R, C>
where
    G: ModelGateway,
    S: ThreadStore,
    R: ResumptionStore,
    C: ChangelogQuery,
{
    /// Run the round's pre-search if web search was enabled at commit time.
    /// The trigger is atomic check-and-mark: the first caller runs the
    /// search, later callers wait for the existing record to turn terminal.
    pub(super) async fn run_presearch(
        &self,
        round: u32,
        query: &str,
        progress: &dyn RoundProgress,
    ) -> Result<(), EngineError> {
        let (enabled, thread_id) = {
            let st = self.state();
            (st.thread.enable_web_search, st.thread.id.clone())
        };
        if !enabled {
            return Ok(());
        }

        if !self.state().guards.try_mark(GuardKey::PreSearch { round }) {
            debug!(round, "pre-search already triggered for this round");
            return self.await_presearch_terminal(round).await;
        }

        let record = PreSearch::new(&thread_id, round, query, Utc::now());
        self.store.create_presearch(&record).await?;
        progress.on_presearch_start(round);
        self.store
            .patch_presearch(&thread_id, round, PreSearchStatus::Streaming, None, false)
            .await?;

        let window = std::time::Duration::from_secs(self.policy.presearch_stale_secs);
        match tokio::time::timeout(window, self.gateway.fetch_presearch(query)).await {
            Ok(Ok(payload)) => {
                self.store
                    .patch_presearch(
                        &thread_id,
                        round,
                        PreSearchStatus::Complete,
                        Some(payload),
                        false,
                    )
                    .await?;
                info!(round, "pre-search complete");
                progress.on_presearch_done(round, false);
            }
            Ok(Err(e)) => {
                // terminal error still unblocks the round
                warn!(round, error = %e, "pre-search failed");
                self.store
                    .patch_presearch(&thread_id, round, PreSearchStatus::Error, None, false)
                    .await?;
                progress.on_presearch_done(round, false);
            }
            Err(_) => {
                warn!(round, forced = true, "pre-search stalled; forcing complete");
                self.store
                    .patch_presearch(&thread_id, round, PreSearchStatus::Complete, None, true)
                    .await?;
                progress.on_presearch_done(round, true);
            }
        }
        Ok(())
    }

    /// Block until the round's pre-search (if one exists) is terminal,
    /// forcing completion once the staleness window passes.
    pub(super) async fn await_presearch_terminal(&self, round: u32) -> Result<(), EngineError> {
        let thread_id = self.state().thread.id.clone();
        loop {
            let Some(record) = self.store.presearch(&thread_id, round).await? else {
                return Ok(());
            };
            if record.unblocks_round() {
                return Ok(());
            }
            if record.is_stale(Utc::now(), self.policy.presearch_stale()) {
                warn!(round, forced = true, "pre-search stalled; forcing complete");
                self.store
                    .patch_presearch(&thread_id, round, PreSearchStatus::Complete, None, true)
                    .await?;
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        }
    }
}
