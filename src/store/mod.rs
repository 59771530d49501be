//! Durable record of the active subscription.
//!
//! A single JSON file holding the current subscription id, so the lifecycle
//! manager can renew or replace it across restarts instead of piling up
//! duplicate registrations.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSubscription {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SubscriptionStore {
    path: PathBuf,
}

impl SubscriptionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the stored record. A missing or unreadable file is treated as
    /// "no active subscription"; corruption is logged and discarded.
    pub fn load(&self) -> Option<StoredSubscription> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Discarding unreadable subscription record at {:?}: {e}", self.path);
                None
            }
        }
    }

    pub fn save(&self, record: &StoredSubscription) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create state directory")?;
        }

        let content =
            serde_json::to_string_pretty(record).context("Failed to serialize subscription record")?;
        std::fs::write(&self.path, content).context("Failed to write subscription record")?;

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove subscription record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str) -> StoredSubscription {
        StoredSubscription {
            id: id.to_string(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = SubscriptionStore::new(dir.path().join("nested").join("subscription.json"));

        store.save(&record("sub-42")).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.id, "sub-42");
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = SubscriptionStore::new(dir.path().join("subscription.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subscription.json");
        std::fs::write(&path, "not json").unwrap();

        let store = SubscriptionStore::new(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = SubscriptionStore::new(dir.path().join("subscription.json"));

        store.save(&record("sub-1")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
    }
}
