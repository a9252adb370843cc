//! # State Management Module
//!
//! Questo modulo gestisce il record store: record aggregato e status di
//! ottimizzazione, indicizzati per attachment id.
//!
//! ## Responsabilità:
//! - Definisce il trait `RecordStore` (load/save/status/clear)
//! - `JsonStateStore`: persistenza su un file JSON unico
//! - `MemoryStore`: implementazione in memoria
//!
//! ## Atomicità:
//! - `save_outcome` scrive record e status nello stesso passo
//! - Il file JSON viene scritto su un file temporaneo e poi rinominato,
//!   quindi un lettore non vede mai uno stato scritto a metà
//!
//! ## Esempio struttura state file:
//! ```json
//! {
//!   "attachments": {
//!     "42": {
//!       "status": "success",
//!       "record": { "aggressiveness_level": 1, "total_original_bytes": 3000, "...": "..." }
//!     }
//!   }
//! }
//! ```

use crate::attachment::AttachmentId;
use crate::error::{OptimizeError, Result};
use crate::record::{OptimizationRecord, OptimizationStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Attachment-scoped persistence of the optimization record and status
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load(&self, id: AttachmentId) -> Result<Option<OptimizationRecord>>;

    async fn save(&self, id: AttachmentId, record: &OptimizationRecord) -> Result<()>;

    async fn load_status(&self, id: AttachmentId) -> Result<OptimizationStatus>;

    async fn save_status(&self, id: AttachmentId, status: OptimizationStatus) -> Result<()>;

    /// Write record and status together
    async fn save_outcome(
        &self,
        id: AttachmentId,
        record: &OptimizationRecord,
        status: OptimizationStatus,
    ) -> Result<()>;

    /// Remove record and status
    async fn clear(&self, id: AttachmentId) -> Result<()>;
}

/// Stored state of one attachment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredAttachment {
    #[serde(default)]
    pub status: OptimizationStatus,
    #[serde(default)]
    pub record: Option<OptimizationRecord>,
}

impl StoredAttachment {
    fn is_empty(&self) -> bool {
        self.status == OptimizationStatus::None && self.record.is_none()
    }
}

/// State file to track optimized attachments
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateFile {
    pub attachments: BTreeMap<u64, StoredAttachment>,
}

/// Single JSON file holding every attachment's state
pub struct JsonStateStore {
    state_file_path: PathBuf,
    state: Mutex<StateFile>,
}

impl JsonStateStore {
    /// Open the state file; a missing file starts empty
    pub async fn open(state_file_path: &Path) -> Result<Self> {
        if let Some(parent) = state_file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let state = if state_file_path.exists() {
            let content = fs::read_to_string(state_file_path).await?;
            serde_json::from_str(&content).map_err(|e| {
                OptimizeError::State(format!("{}: {}", state_file_path.display(), e))
            })?
        } else {
            StateFile::default()
        };

        Ok(Self {
            state_file_path: state_file_path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    async fn persist(&self, state: &StateFile) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;
        let tmp_path = self.state_file_path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.state_file_path).await?;
        debug!("State saved to {}", self.state_file_path.display());
        Ok(())
    }

    async fn update<F>(&self, id: AttachmentId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut StoredAttachment) + Send,
    {
        let mut state = self.state.lock().await;
        let mut attachments = state.attachments.clone();
        let entry = attachments.entry(id.0).or_default();
        apply(entry);
        if entry.is_empty() {
            attachments.remove(&id.0);
        }

        // Memory only changes once the new state is on disk
        let next = StateFile { attachments };
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonStateStore {
    async fn load(&self, id: AttachmentId) -> Result<Option<OptimizationRecord>> {
        let state = self.state.lock().await;
        Ok(state.attachments.get(&id.0).and_then(|e| e.record.clone()))
    }

    async fn save(&self, id: AttachmentId, record: &OptimizationRecord) -> Result<()> {
        let record = record.clone();
        self.update(id, move |entry| entry.record = Some(record)).await
    }

    async fn load_status(&self, id: AttachmentId) -> Result<OptimizationStatus> {
        let state = self.state.lock().await;
        Ok(state.attachments.get(&id.0).map(|e| e.status).unwrap_or_default())
    }

    async fn save_status(&self, id: AttachmentId, status: OptimizationStatus) -> Result<()> {
        self.update(id, move |entry| entry.status = status).await
    }

    async fn save_outcome(
        &self,
        id: AttachmentId,
        record: &OptimizationRecord,
        status: OptimizationStatus,
    ) -> Result<()> {
        let record = record.clone();
        self.update(id, move |entry| {
            entry.record = Some(record);
            entry.status = status;
        })
        .await
    }

    async fn clear(&self, id: AttachmentId) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.attachments.contains_key(&id.0) {
            return Ok(());
        }

        let mut attachments = state.attachments.clone();
        attachments.remove(&id.0);
        let next = StateFile { attachments };
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<AttachmentId, StoredAttachment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load(&self, id: AttachmentId) -> Result<Option<OptimizationRecord>> {
        Ok(self.entries.lock().await.get(&id).and_then(|e| e.record.clone()))
    }

    async fn save(&self, id: AttachmentId, record: &OptimizationRecord) -> Result<()> {
        self.entries.lock().await.entry(id).or_default().record = Some(record.clone());
        Ok(())
    }

    async fn load_status(&self, id: AttachmentId) -> Result<OptimizationStatus> {
        Ok(self.entries.lock().await.get(&id).map(|e| e.status).unwrap_or_default())
    }

    async fn save_status(&self, id: AttachmentId, status: OptimizationStatus) -> Result<()> {
        self.entries.lock().await.entry(id).or_default().status = status;
        Ok(())
    }

    async fn save_outcome(
        &self,
        id: AttachmentId,
        record: &OptimizationRecord,
        status: OptimizationStatus,
    ) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(id).or_default();
        entry.record = Some(record.clone());
        entry.status = status;
        Ok(())
    }

    async fn clear(&self, id: AttachmentId) -> Result<()> {
        self.entries.lock().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_store_outcome_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state/optimizer.json");
        let id = AttachmentId(42);

        let store = JsonStateStore::open(&path).await.unwrap();
        assert_eq!(store.load(id).await.unwrap(), None);
        assert_eq!(store.load_status(id).await.unwrap(), OptimizationStatus::None);

        let mut record = OptimizationRecord::new(2);
        record.total_original_bytes = 10;
        store.save_outcome(id, &record, OptimizationStatus::Success).await.unwrap();

        let reopened = JsonStateStore::open(&path).await.unwrap();
        assert_eq!(reopened.load(id).await.unwrap(), Some(record));
        assert_eq!(reopened.load_status(id).await.unwrap(), OptimizationStatus::Success);
        assert!(!temp_dir.path().join("state/optimizer.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_store_clear_removes_both_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("optimizer.json");
        let id = AttachmentId(7);

        let store = JsonStateStore::open(&path).await.unwrap();
        store.save(id, &OptimizationRecord::new(1)).await.unwrap();
        store.save_status(id, OptimizationStatus::Error).await.unwrap();
        store.clear(id).await.unwrap();

        let reopened = JsonStateStore::open(&path).await.unwrap();
        assert_eq!(reopened.load(id).await.unwrap(), None);
        assert_eq!(reopened.load_status(id).await.unwrap(), OptimizationStatus::None);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("optimizer.json");
        let id = AttachmentId(42);

        let store = JsonStateStore::open(&path).await.unwrap();
        store.save_outcome(id, &OptimizationRecord::new(1), OptimizationStatus::Error).await.unwrap();

        // A directory where the temp file goes makes every write fail
        std::fs::create_dir(temp_dir.path().join("optimizer.json.tmp")).unwrap();

        let result = store.save_outcome(id, &OptimizationRecord::new(2), OptimizationStatus::Success).await;
        assert!(result.is_err());
        assert_eq!(store.load_status(id).await.unwrap(), OptimizationStatus::Error);
        assert_eq!(store.load(id).await.unwrap().unwrap().aggressiveness_level, 1);

        assert!(store.clear(id).await.is_err());
        assert_eq!(store.load_status(id).await.unwrap(), OptimizationStatus::Error);

        std::fs::remove_dir(temp_dir.path().join("optimizer.json.tmp")).unwrap();
        let reopened = JsonStateStore::open(&path).await.unwrap();
        assert_eq!(reopened.load_status(id).await.unwrap(), OptimizationStatus::Error);
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("optimizer.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(JsonStateStore::open(&path).await, Err(OptimizeError::State(_))));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        let id = AttachmentId(1);

        store.save_outcome(id, &OptimizationRecord::new(0), OptimizationStatus::Error).await.unwrap();
        assert_eq!(store.load_status(id).await.unwrap(), OptimizationStatus::Error);
        assert!(store.load(id).await.unwrap().is_some());

        store.clear(id).await.unwrap();
        assert_eq!(store.load_status(id).await.unwrap(), OptimizationStatus::None);
        assert!(store.load(id).await.unwrap().is_none());
    }
}
