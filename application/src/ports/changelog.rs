//! Changelog query port
//!
//! Given a thread and round, returns the changelog entries recorded for the
//! configuration changes that took effect in that round. An empty result is
//! a valid terminal response: it still clears the waiting flags.

use async_trait::async_trait;
use roundtable_domain::ChangelogEntry;

use super::thread_store::StoreError;

#[async_trait]
pub trait ChangelogQuery: Send + Sync {
    async fn entries_for_round(
        &self,
        thread_id: &str,
        round: u32,
    ) -> Result<Vec<ChangelogEntry>, StoreError>;
}
