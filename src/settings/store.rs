//! Settings store implementations.
//!
//! The production settings service lives outside this crate; these stores
//! implement its read contract. `JsonSettingsStore` re-reads the file on
//! every call on purpose: settings must never be cached across users or
//! across fleet passes.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::UserSettings;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only view of the external settings service.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Settings for one user, or `None` when the user has no settings row.
    async fn get(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError>;

    /// All users with `scheduler_enabled = true`.
    async fn list_enabled(&self) -> Result<Vec<UserSettings>, StoreError>;
}

/// In-memory store, used by tests and demo seeding.
#[derive(Default)]
pub struct MemorySettingsStore {
    users: RwLock<HashMap<String, UserSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, settings: UserSettings) {
        self.users
            .write()
            .await
            .insert(settings.user_id.clone(), settings);
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn list_enabled(&self) -> Result<Vec<UserSettings>, StoreError> {
        let mut enabled: Vec<UserSettings> = self
            .users
            .read()
            .await
            .values()
            .filter(|s| s.scheduler_enabled)
            .cloned()
            .collect();
        enabled.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(enabled)
    }
}

/// Settings backed by a JSON array file.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<Vec<UserSettings>, StoreError> {
        if !self.path.exists() {
            debug!("Settings file {:?} does not exist yet", self.path);
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let users: Vec<UserSettings> = serde_json::from_str(&content)?;
        Ok(users)
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
        let users = self.read_all().await?;
        Ok(users.into_iter().find(|s| s.user_id == user_id))
    }

    async fn list_enabled(&self) -> Result<Vec<UserSettings>, StoreError> {
        let users = self.read_all().await?;
        Ok(users.into_iter().filter(|s| s.scheduler_enabled).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_filters_enabled() {
        let store = MemorySettingsStore::new();
        let mut a = UserSettings::defaults("a");
        let mut b = UserSettings::defaults("b");
        a.scheduler_enabled = true;
        b.scheduler_enabled = false;
        store.insert(a).await;
        store.insert(b).await;

        let enabled = store.list_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].user_id, "a");
        assert!(store.get("b").await.unwrap().is_some());
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_store_round_trips() {
        let path = std::env::temp_dir().join(format!("autopunch-test-{}.json", uuid::Uuid::new_v4()));
        let users = vec![UserSettings::defaults("u1"), {
            let mut u = UserSettings::defaults("u2");
            u.scheduler_enabled = false;
            u
        }];
        tokio::fs::write(&path, serde_json::to_string_pretty(&users).unwrap())
            .await
            .unwrap();

        let store = JsonSettingsStore::new(&path);
        assert_eq!(store.list_enabled().await.unwrap().len(), 1);
        let u2 = store.get("u2").await.unwrap().unwrap();
        assert!(!u2.scheduler_enabled);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn json_store_missing_file_is_empty() {
        let store = JsonSettingsStore::new("/nonexistent/autopunch-users.json");
        assert!(store.list_enabled().await.unwrap().is_empty());
    }
}
