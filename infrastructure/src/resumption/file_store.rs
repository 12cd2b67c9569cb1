//! File-backed resumption store.
//!
//! All records live in one JSON file, rewritten on every mutation. Writes go
//! through a temp file and rename so a crash mid-write leaves the previous
//! snapshot intact. Throughput needs are tiny (a handful of writes per
//! round), so a full rewrite is fine.

use async_trait::async_trait;
use roundtable_application::ports::{ResumptionStore, StoreError};
use roundtable_domain::StreamResumptionState;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Durable [`ResumptionStore`] backed by a single JSON file
pub struct FileResumptionStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    write_lock: Mutex<()>,
}

impl FileResumptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<HashMap<String, StreamResumptionState>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Io(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    async fn save(
        &self,
        records: &HashMap<String, StreamResumptionState>,
    ) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let bytes =
            serde_json::to_vec_pretty(records).map_err(|e| StoreError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        debug!(path = %self.path.display(), records = records.len(), "resumption snapshot written");
        Ok(())
    }
}

#[async_trait]
impl ResumptionStore for FileResumptionStore {
    async fn get(&self, key: &str) -> Result<Option<StreamResumptionState>, StoreError> {
        let records = self.load().await?;
        Ok(records.get(key).cloned())
    }

    async fn set(&self, key: &str, state: &StreamResumptionState) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        records.insert(key.to_string(), state.clone());
        self.save(&records).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        if records.remove(key).is_some() {
            self.save(&records).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roundtable_application::ports::{active_key, stream_key};
    use roundtable_domain::StreamStatus;

    #[tokio::test]
    async fn records_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resumption.json");

        let mut record = StreamResumptionState::new("t1", 0, 3, Utc::now());
        record.mark(0, StreamStatus::Completed, Utc::now());
        record.mark(1, StreamStatus::Active, Utc::now());

        {
            let store = FileResumptionStore::new(&path);
            store.set(&active_key("t1"), &record).await.unwrap();
            store.set(&stream_key(&record.stream_id), &record).await.unwrap();
        }

        // fresh instance reading the same file, as after a restart
        let store = FileResumptionStore::new(&path);
        let loaded = store.get(&active_key("t1")).await.unwrap().unwrap();
        assert_eq!(loaded.next_to_stream(), Some(1));
        assert_eq!(loaded.statuses.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResumptionStore::new(dir.path().join("nope.json"));
        assert!(store.get(&active_key("t1")).await.unwrap().is_none());
        // deleting a key that was never written is fine too
        store.delete(&active_key("t1")).await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_only_the_given_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResumptionStore::new(dir.path().join("resumption.json"));
        let record = StreamResumptionState::new("t1", 0, 1, Utc::now());
        store.set(&active_key("t1"), &record).await.unwrap();
        store.set(&active_key("t2"), &record).await.unwrap();

        store.delete(&active_key("t1")).await.unwrap();
        assert!(store.get(&active_key("t1")).await.unwrap().is_none());
        assert!(store.get(&active_key("t2")).await.unwrap().is_some());
    }
}
