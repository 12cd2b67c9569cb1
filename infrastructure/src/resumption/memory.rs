//! In-memory resumption store

use async_trait::async_trait;
use roundtable_application::ports::{ResumptionStore, StoreError};
use roundtable_domain::StreamResumptionState;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keeps resumption records in a process-local map. Suitable for tests and
/// single-session runs; anything that must survive a restart wants
/// [`super::FileResumptionStore`].
#[derive(Default)]
pub struct InMemoryResumptionStore {
    records: Mutex<HashMap<String, StreamResumptionState>>,
}

impl InMemoryResumptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResumptionStore for InMemoryResumptionStore {
    async fn get(&self, key: &str) -> Result<Option<StreamResumptionState>, StoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(key).cloned())
    }

    async fn set(&self, key: &str, state: &StreamResumptionState) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(key.to_string(), state.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.remove(key);
        Ok(())
    }
}
