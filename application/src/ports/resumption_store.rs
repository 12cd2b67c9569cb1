//! Durable resumption store port
//!
//! A key-value store holding one [`StreamResumptionState`] per key. Two key
//! families exist: `stream:{stream_id}` for a specific turn's record and
//! `thread:{thread_id}:active` for the thread's currently active round.

use async_trait::async_trait;
use roundtable_domain::StreamResumptionState;

use super::thread_store::StoreError;

/// Key for a specific stream's record
pub fn stream_key(stream_id: &str) -> String {
    format!("stream:{stream_id}")
}

/// Key for a thread's active-round anchor
pub fn active_key(thread_id: &str) -> String {
    format!("thread:{thread_id}:active")
}

/// Durable key-value store for resumption records
#[async_trait]
pub trait ResumptionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StreamResumptionState>, StoreError>;
    async fn set(&self, key: &str, state: &StreamResumptionState) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
