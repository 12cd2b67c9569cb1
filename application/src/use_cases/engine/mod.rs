//! The round engine
//!
//! Orchestrates a full round: commit staged configuration, sync the
//! changelog gate, run the optional pre-search, stream every enabled
//! participant strictly in priority order, then trigger moderation exactly
//! once. Every one-shot step goes through the idempotency guards, so the
//! engine tolerates its triggers being invoked more than once per logical
//! event.

mod moderation;
mod presearch;
mod regenerate;
mod resume;
mod streaming;


use crate::config::OrchestratorPolicy;
use crate::ports::{
    ChangelogQuery, GatewayError, ModelGateway, ResumptionStore, RoundProgress, StoreError,
    ThreadPatch, ThreadStore, active_key,
};
use crate::state::EngineState;
use chrono::Utc;
use roundtable_domain::{
    ChangelogEntry, GuardKey, Message, Participant, diff_config, next_round, round_roster,
    summarize,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use resume::ResumeAction;

/// Errors that can occur while driving a round
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("A round is already streaming")]
    RoundInFlight,

    #[error("No participants enabled for the round")]
    NoParticipants,

    #[error("Nothing to regenerate: no submitted round")]
    NothingToRegenerate,

    #[error("Configuration commit failed: {0}")]
    CommitFailed(#[source] StoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// What a submission ended as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The round ran to completion, moderation included
    Completed { round: u32 },
    /// A stop ended the round early
    Stopped { round: u32 },
    /// The submit trigger was already marked for this round; nothing ran
    Duplicate,
}

/// The orchestration engine for one thread
pub struct RoundEngine<G, S, R, C>
where
    G: ModelGateway,
    S: ThreadStore,
    R: ResumptionStore,
    C: ChangelogQuery,
{
    gateway: Arc<G>,
    store: Arc<S>,
    resumption: Arc<R>,
    changelog: Arc<C>,
    policy: OrchestratorPolicy,
    state: Mutex<EngineState>,
    cancel: Mutex<CancellationToken>,
}

impl<G, S, R, C> RoundEngine<G, S, R, C>
where
    G: ModelGateway,
    S: ThreadStore,
    R: ResumptionStore,
    C: ChangelogQuery,
{
    pub fn new(
        gateway: Arc<G>,
        store: Arc<S>,
        resumption: Arc<R>,
        changelog: Arc<C>,
        state: EngineState,
    ) -> Self {
        Self {
            gateway,
            store,
            resumption,
            changelog,
            policy: OrchestratorPolicy::default(),
            state: Mutex::new(state),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn with_policy(mut self, policy: OrchestratorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build an engine from persisted state, e.g. after a reload.
    pub async fn load(
        gateway: Arc<G>,
        store: Arc<S>,
        resumption: Arc<R>,
        changelog: Arc<C>,
        thread_id: &str,
    ) -> Result<Self, EngineError> {
        let thread = store.thread(thread_id).await?;
        let participants = store.participants(thread_id).await?;
        let messages = store.messages(thread_id).await?;
        let mut state = EngineState::new(thread, participants);
        state.messages = messages;
        Ok(Self::new(gateway, store, resumption, changelog, state))
    }

    /// Submit a user prompt, running the full round cycle.
    pub async fn submit(
        &self,
        prompt: &str,
        progress: &dyn RoundProgress,
    ) -> Result<SubmitOutcome, EngineError> {
        let round = {
            let mut st = self.state();
            if st.is_streaming() {
                return Err(EngineError::RoundInFlight);
            }
            st.self_heal_flags();
            let round = next_round(&st.messages);
            if !st.guards.try_mark(GuardKey::Submit { round }) {
                debug!(round, "duplicate submit ignored");
                return Ok(SubmitOutcome::Duplicate);
            }
            round
        };

        if let Err(e) = self.commit_config(round).await {
            // staged edits stay put so the user can retry the submission
            self.state().guards.release(&GuardKey::Submit { round });
            return Err(e);
        }
        self.sync_changelog(round).await;

        // roster snapshot after the commit: this round streams the newly
        // committed participants. Checked before the user message is written
        // so a roster-less submit leaves no orphaned round behind.
        let roster = self.roster();
        if roster.is_empty() {
            self.state().guards.release(&GuardKey::Submit { round });
            return Err(EngineError::NoParticipants);
        }

        let user = {
            let st = self.state();
            Message::user(&st.thread.id, round, prompt, Utc::now())
        };
        self.store.create_message(&user).await?;
        self.state().record_message(user);
        info!(round, participants = roster.len(), "round started");
        progress.on_round_start(round, roster.len());

        self.run_presearch(round, prompt, progress).await?;
        self.run_round_body(round, &roster, None, progress).await
    }

    /// Stop the active round. The streaming flag and participant index are
    /// reset in one transition and the in-flight stream is cancelled; a
    /// completion racing the stop is discarded. Returns false when nothing
    /// is streaming, including a duplicate stop in the same round.
    pub fn stop(&self) -> bool {
        let round = {
            let mut st = self.state();
            if !st.is_streaming() {
                return false;
            }
            let Some(round) = roundtable_domain::current_round(&st.messages) else {
                return false;
            };
            if !st.guards.try_mark(GuardKey::Stop { round }) {
                debug!(round, "duplicate stop ignored");
                return false;
            }
            st.apply_stop();
            round
        };
        self.cancel_guard().cancel();
        info!(round, "round stopped");
        true
    }

    /// Current committed roster in turn order.
    pub(super) fn roster(&self) -> Vec<Participant> {
        let st = self.state();
        round_roster(&st.participants).into_iter().cloned().collect()
    }

    /// Run the already-gated portion of a round: participant turns, then
    /// moderation, then close. Shared by submit, resume, and regenerate.
    pub(super) async fn run_round_body(
        &self,
        round: u32,
        roster: &[Participant],
        resume_from: Option<roundtable_domain::StreamResumptionState>,
        progress: &dyn RoundProgress,
    ) -> Result<SubmitOutcome, EngineError> {
        let cancel = self.fresh_cancel();
        let stopped = self
            .run_turns(round, roster, resume_from, progress, &cancel)
            .await?;
        if stopped {
            return Ok(SubmitOutcome::Stopped { round });
        }
        self.maybe_moderate(round, roster, progress).await?;
        self.close_round().await?;
        progress.on_round_complete(round);
        info!(round, "round complete");
        Ok(SubmitOutcome::Completed { round })
    }

    /// Commit staged configuration for `round`. On persistence failure the
    /// staged edits are preserved and the error surfaced.
    async fn commit_config(&self, round: u32) -> Result<(), EngineError> {
        let (thread_id, changes, staged) = {
            let st = self.state();
            let Some(staged) = st.staged.clone() else {
                return Ok(());
            };
            let changes = diff_config(&st.thread, &st.participants, &staged);
            (st.thread.id.clone(), changes, staged)
        };

        if changes.is_empty() {
            // staging that diffs to nothing commits silently, no gate
            self.state().commit_staging(round, false);
            return Ok(());
        }

        let patch = ThreadPatch {
            mode: Some(staged.mode),
            enable_web_search: Some(staged.enable_web_search),
            title: None,
        };
        let thread_outcome = self
            .store
            .patch_thread(&thread_id, patch)
            .await
            .map_err(EngineError::CommitFailed)?;
        let roster_outcome = self
            .store
            .replace_participants(&thread_id, &staged.participants)
            .await
            .map_err(EngineError::CommitFailed)?;

        let entries: Vec<ChangelogEntry> = changes
            .into_iter()
            .map(|c| ChangelogEntry::from_change(&thread_id, round, c))
            .collect();
        self.store
            .append_changelog(&entries)
            .await
            .map_err(EngineError::CommitFailed)?;

        let has_changes = thread_outcome.has_any_changes || roster_outcome.has_any_changes;
        info!(round, changes = %summarize(&entries), "configuration committed");
        self.state().commit_staging(round, has_changes);
        Ok(())
    }

    /// Resolve the changelog gate: fetch/merge entries for the round, then
    /// clear both flags together. Fetch failures are retried for as long as
    /// the safety window allows; only a merged response or the window
    /// elapsing clears the gate. An empty entry list is a valid terminal
    /// response.
    async fn sync_changelog(&self, round: u32) {
        let blocked = {
            let mut st = self.state();
            st.self_heal_flags();
            st.changelog_gate_blocked()
        };
        if !blocked {
            return;
        }
        let thread_id = self.state().thread.id.clone();
        let fetch_until_merged = async {
            loop {
                match self.changelog.entries_for_round(&thread_id, round).await {
                    Ok(entries) => break entries,
                    Err(e) => {
                        debug!(round, error = %e, "changelog fetch failed; retrying");
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                }
            }
        };
        match tokio::time::timeout(self.policy.changelog_wait(), fetch_until_merged).await {
            Ok(entries) => {
                debug!(round, count = entries.len(), "changelog merged");
            }
            Err(_) => {
                warn!(round, "changelog wait timed out; clearing gate");
            }
        }
        self.state().clear_changelog_wait();
    }

    /// Drop the thread's active-round anchor once the round is closed.
    async fn close_round(&self) -> Result<(), EngineError> {
        let thread_id = self.state().thread.id.clone();
        self.resumption.delete(&active_key(&thread_id)).await?;
        Ok(())
    }

    pub(super) fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel_guard(&self) -> CancellationToken {
        self.cancel.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Install a fresh cancellation scope for a new round.
    pub(super) fn fresh_cancel(&self) -> CancellationToken {
        let mut guard = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        *guard = CancellationToken::new();
        guard.clone()
    }
}
