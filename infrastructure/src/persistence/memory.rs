//! In-memory persistence adapter.
//!
//! Backs every [`ThreadStore`] operation with plain maps behind one mutex.
//! The pre-search monotonicity rule is enforced here, not in the engine: a
//! downgrade write is reported as an unchanged patch, never applied.

use async_trait::async_trait;
use chrono::Utc;
use roundtable_application::ports::{
    ChangelogQuery, MessagePatch, PatchOutcome, StoreError, ThreadPatch, ThreadStore,
};
use roundtable_domain::{
    Analysis, ChangelogEntry, Message, Participant, PreSearch, PreSearchStatus, Thread,
};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Tables {
    threads: HashMap<String, Thread>,
    rosters: HashMap<String, Vec<Participant>>,
    messages: Vec<Message>,
    presearches: HashMap<(String, u32), PreSearch>,
    analyses: HashMap<(String, u32), Analysis>,
    changelog: Vec<ChangelogEntry>,
}

/// In-memory [`ThreadStore`] (and [`ChangelogQuery`]) implementation
#[derive(Default)]
pub struct InMemoryThreadStore {
    tables: Mutex<Tables>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn create_thread(&self, thread: &Thread) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.threads.contains_key(&thread.id) {
            return Err(StoreError::Conflict(thread.id.clone()));
        }
        tables.threads.insert(thread.id.clone(), thread.clone());
        Ok(())
    }

    async fn thread(&self, thread_id: &str) -> Result<Thread, StoreError> {
        self.lock()
            .threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(thread_id.to_string()))
    }

    async fn patch_thread(
        &self,
        thread_id: &str,
        patch: ThreadPatch,
    ) -> Result<PatchOutcome, StoreError> {
        let mut tables = self.lock();
        let thread = tables
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::NotFound(thread_id.to_string()))?;
        let mut changed = false;
        if let Some(mode) = patch.mode
            && thread.mode != mode
        {
            thread.mode = mode;
            changed = true;
        }
        if let Some(enabled) = patch.enable_web_search
            && thread.enable_web_search != enabled
        {
            thread.enable_web_search = enabled;
            changed = true;
        }
        if let Some(title) = patch.title
            && thread.title != title
        {
            thread.title = title;
            changed = true;
        }
        if changed {
            thread.updated_at = Utc::now();
        }
        Ok(PatchOutcome { has_any_changes: changed })
    }

    async fn replace_participants(
        &self,
        thread_id: &str,
        roster: &[Participant],
    ) -> Result<PatchOutcome, StoreError> {
        let mut tables = self.lock();
        let old = tables
            .rosters
            .insert(thread_id.to_string(), roster.to_vec());
        let changed = old.as_deref() != Some(roster);
        Ok(PatchOutcome { has_any_changes: changed })
    }

    async fn participants(&self, thread_id: &str) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .lock()
            .rosters
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.messages.iter().any(|m| m.id == message.id) {
            return Err(StoreError::Conflict(message.id.clone()));
        }
        tables.messages.push(message.clone());
        Ok(())
    }

    async fn patch_message(
        &self,
        message_id: &str,
        patch: MessagePatch,
    ) -> Result<PatchOutcome, StoreError> {
        let mut tables = self.lock();
        let message = tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StoreError::NotFound(message_id.to_string()))?;
        let mut changed = false;
        if let Some(content) = patch.content
            && message.content != content
        {
            message.content = content;
            changed = true;
        }
        if let Some(reason) = patch.finish_reason
            && message.finish_reason != reason
        {
            message.finish_reason = reason;
            changed = true;
        }
        Ok(PatchOutcome { has_any_changes: changed })
    }

    async fn messages(&self, thread_id: &str) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .lock()
            .messages
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect())
    }

    async fn create_presearch(&self, presearch: &PreSearch) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let key = (presearch.thread_id.clone(), presearch.round_number);
        if tables.presearches.contains_key(&key) {
            return Err(StoreError::Conflict(presearch.id.clone()));
        }
        tables.presearches.insert(key, presearch.clone());
        Ok(())
    }

    async fn patch_presearch(
        &self,
        thread_id: &str,
        round: u32,
        status: PreSearchStatus,
        result: Option<serde_json::Value>,
        forced: bool,
    ) -> Result<PatchOutcome, StoreError> {
        let mut tables = self.lock();
        let record = tables
            .presearches
            .get_mut(&(thread_id.to_string(), round))
            .ok_or_else(|| StoreError::NotFound(format!("presearch {thread_id} r{round}")))?;
        let changed = if forced {
            record.force_complete(Utc::now())
        } else {
            record.advance(status, Utc::now())
        };
        if !changed {
            debug!(
                round,
                current = record.status.as_str(),
                attempted = status.as_str(),
                "pre-search status write refused"
            );
        } else if result.is_some() {
            record.result = result;
        }
        Ok(PatchOutcome { has_any_changes: changed })
    }

    async fn presearch(
        &self,
        thread_id: &str,
        round: u32,
    ) -> Result<Option<PreSearch>, StoreError> {
        Ok(self
            .lock()
            .presearches
            .get(&(thread_id.to_string(), round))
            .cloned())
    }

    async fn create_analysis(&self, analysis: &Analysis) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let key = (analysis.thread_id.clone(), analysis.round_number);
        if tables.analyses.contains_key(&key) {
            return Err(StoreError::Conflict(analysis.id.clone()));
        }
        tables.analyses.insert(key, analysis.clone());
        Ok(())
    }

    async fn analysis(&self, thread_id: &str, round: u32) -> Result<Option<Analysis>, StoreError> {
        Ok(self
            .lock()
            .analyses
            .get(&(thread_id.to_string(), round))
            .cloned())
    }

    async fn append_changelog(&self, entries: &[ChangelogEntry]) -> Result<(), StoreError> {
        self.lock().changelog.extend_from_slice(entries);
        Ok(())
    }

    async fn delete_round_outputs(&self, thread_id: &str, round: u32) -> Result<u32, StoreError> {
        let mut tables = self.lock();
        let before = tables.messages.len();
        tables.messages.retain(|m| {
            m.thread_id != thread_id || m.round_number != Some(round) || m.is_user()
        });
        let mut deleted = (before - tables.messages.len()) as u32;
        if tables
            .analyses
            .remove(&(thread_id.to_string(), round))
            .is_some()
        {
            deleted += 1;
        }
        Ok(deleted)
    }
}

#[async_trait]
impl ChangelogQuery for InMemoryThreadStore {
    async fn entries_for_round(
        &self,
        thread_id: &str,
        round: u32,
    ) -> Result<Vec<ChangelogEntry>, StoreError> {
        Ok(self
            .lock()
            .changelog
            .iter()
            .filter(|e| e.thread_id == thread_id && e.round_number == round)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_domain::FinishReason;

    #[tokio::test]
    async fn duplicate_thread_is_a_conflict() {
        let store = InMemoryThreadStore::new();
        let thread = Thread::new("t1", "test", Utc::now());
        store.create_thread(&thread).await.unwrap();
        assert!(matches!(
            store.create_thread(&thread).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn patch_thread_reports_real_changes_only() {
        let store = InMemoryThreadStore::new();
        store
            .create_thread(&Thread::new("t1", "test", Utc::now()))
            .await
            .unwrap();

        let outcome = store
            .patch_thread(
                "t1",
                ThreadPatch { enable_web_search: Some(true), ..Default::default() },
            )
            .await
            .unwrap();
        assert!(outcome.has_any_changes);

        // same value again: unchanged
        let outcome = store
            .patch_thread(
                "t1",
                ThreadPatch { enable_web_search: Some(true), ..Default::default() },
            )
            .await
            .unwrap();
        assert!(!outcome.has_any_changes);
    }

    #[tokio::test]
    async fn presearch_downgrade_is_refused() {
        let store = InMemoryThreadStore::new();
        store
            .create_presearch(&PreSearch::new("t1", 0, "q", Utc::now()))
            .await
            .unwrap();
        store
            .patch_presearch("t1", 0, PreSearchStatus::Complete, None, false)
            .await
            .unwrap();

        let outcome = store
            .patch_presearch("t1", 0, PreSearchStatus::Streaming, None, false)
            .await
            .unwrap();
        assert!(!outcome.has_any_changes);
        let record = store.presearch("t1", 0).await.unwrap().unwrap();
        assert_eq!(record.status, PreSearchStatus::Complete);
    }

    #[tokio::test]
    async fn forced_completion_survives_a_late_result() {
        let store = InMemoryThreadStore::new();
        store
            .create_presearch(&PreSearch::new("t1", 0, "q", Utc::now()))
            .await
            .unwrap();
        store
            .patch_presearch("t1", 0, PreSearchStatus::Streaming, None, false)
            .await
            .unwrap();
        store
            .patch_presearch("t1", 0, PreSearchStatus::Complete, None, true)
            .await
            .unwrap();

        // the real result arrives after the force; it must not downgrade
        let outcome = store
            .patch_presearch(
                "t1",
                0,
                PreSearchStatus::Complete,
                Some(serde_json::json!({"late": true})),
                false,
            )
            .await
            .unwrap();
        assert!(!outcome.has_any_changes);
        let record = store.presearch("t1", 0).await.unwrap().unwrap();
        assert!(record.forced);
        assert!(record.result.is_none());
    }

    #[tokio::test]
    async fn delete_round_outputs_keeps_user_and_presearch() {
        let store = InMemoryThreadStore::new();
        store
            .create_message(&Message::user("t1", 0, "q", Utc::now()))
            .await
            .unwrap();
        store
            .create_message(
                &Message::participant("t1", 0, 0, Utc::now())
                    .with_finish_reason(FinishReason::Stop),
            )
            .await
            .unwrap();
        store
            .create_message(
                &Message::moderator("t1", 0, Utc::now()).with_finish_reason(FinishReason::Stop),
            )
            .await
            .unwrap();
        store
            .create_analysis(&Analysis::new("t1", 0, vec!["t1_r0_p0".to_string()], Utc::now()))
            .await
            .unwrap();
        store
            .create_presearch(&PreSearch::new("t1", 0, "q", Utc::now()))
            .await
            .unwrap();

        let deleted = store.delete_round_outputs("t1", 0).await.unwrap();
        assert_eq!(deleted, 3); // two messages plus the analysis

        let messages = store.messages("t1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_user());
        assert!(store.presearch("t1", 0).await.unwrap().is_some());
        assert!(store.analysis("t1", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn changelog_entries_filter_by_round() {
        use roundtable_domain::ConfigChange;

        let store = InMemoryThreadStore::new();
        let entries = vec![
            ChangelogEntry::from_change(
                "t1",
                1,
                ConfigChange::WebSearchToggled { enabled: true },
            ),
            ChangelogEntry::from_change(
                "t1",
                2,
                ConfigChange::WebSearchToggled { enabled: false },
            ),
        ];
        store.append_changelog(&entries).await.unwrap();

        let round_one = store.entries_for_round("t1", 1).await.unwrap();
        assert_eq!(round_one.len(), 1);
        assert_eq!(round_one[0].round_number, 1);
        assert!(store.entries_for_round("t2", 1).await.unwrap().is_empty());
    }
}
