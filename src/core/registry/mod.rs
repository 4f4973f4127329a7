mod consul;
mod memory;

pub use consul::ConsulRegistry;
pub use memory::MemoryRegistry;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::apps::App;
use super::error::{RegistryError, SyncError};
use super::health::Health;
use super::keys;
use super::tasks::{HealthCheckResult, Task};

/// Key/value store the orchestrator state is mirrored into. Each call is expected
/// to be atomic on its own; nothing here coordinates across calls.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RegistryError>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), RegistryError>;
    async fn delete(&self, key: &str) -> Result<(), RegistryError>;
}

/// Writes applications and tasks into a [`Registry`] under a common prefix.
#[derive(Clone)]
pub struct Mirror {
    registry: Arc<dyn Registry>,
    prefix: String,
}

impl Mirror {
    pub fn new(registry: Arc<dyn Registry>, prefix: impl Into<String>) -> Self {
        Self {
            registry,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, key: &str) -> String {
        keys::prefixed(&self.prefix, key)
    }

    pub async fn update_app(&self, app: &App) -> Result<(), SyncError> {
        self.put(&app.key(), app).await
    }

    pub async fn delete_app(&self, app: &App) -> Result<(), SyncError> {
        self.delete(&app.key()).await
    }

    pub async fn update_task(&self, task: &Task) -> Result<(), SyncError> {
        self.put(&task.key(), task).await
    }

    pub async fn delete_task(&self, task: &Task) -> Result<(), SyncError> {
        self.delete(&task.key()).await
    }

    /// Set the liveness of an already-mirrored task. A task that was never written
    /// is an error; health events alone never create task records.
    pub async fn update_health(&self, health: &Health) -> Result<(), SyncError> {
        let key = self.key(&health.task_key());
        let Some(raw) = self.registry.get(&key).await? else {
            return Err(SyncError::MissingTask(key));
        };

        let mut task: Task = serde_json::from_slice(&raw)
            .map_err(|source| RegistryError::Decode { key, source })?;
        task.health_check_results = vec![HealthCheckResult {
            alive: health.alive,
        }];
        self.put(&health.task_key(), &task).await
    }

    async fn put<T: Serialize + Sync>(&self, key: &str, record: &T) -> Result<(), SyncError> {
        let key = self.key(key);
        let value = serde_json::to_vec(record).map_err(|source| RegistryError::Serialize {
            key: key.clone(),
            source,
        })?;
        debug!(key = %key, "writing registry record");
        self.registry.put(&key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SyncError> {
        let key = self.key(key);
        debug!(key = %key, "deleting registry record");
        self.registry.delete(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tasks::tests::test_task;

    fn mirror(prefix: &str) -> (Arc<MemoryRegistry>, Mirror) {
        let kv = Arc::new(MemoryRegistry::new());
        let mirror = Mirror::new(kv.clone(), prefix);
        (kv, mirror)
    }

    #[tokio::test]
    async fn update_app_writes_under_prefix() {
        let (kv, mirror) = mirror("marathon");
        mirror.update_app(&App::with_id("/test")).await.unwrap();
        let stored = kv.get("marathon/test").await.unwrap().unwrap();
        assert_eq!(stored, br#"{"id":"/test"}"#.to_vec());
    }

    #[tokio::test]
    async fn delete_app_removes_record() {
        let (kv, mirror) = mirror("");
        let app = App::with_id("test");
        mirror.update_app(&app).await.unwrap();
        mirror.delete_app(&app).await.unwrap();
        assert!(kv.get("test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_health_requires_existing_task() {
        let (_kv, mirror) = mirror("");
        let task = test_task();
        let health = Health {
            app_id: task.app_id.clone(),
            task_id: task.id.clone(),
            timestamp: task.timestamp.clone(),
            alive: true,
        };
        assert!(matches!(
            mirror.update_health(&health).await,
            Err(SyncError::MissingTask(key)) if key == "my-app/tasks/my-app_0-1396592784349"
        ));
    }

    #[tokio::test]
    async fn update_health_flips_only_liveness() {
        let (kv, mirror) = mirror("");
        let task = test_task();
        mirror.update_task(&task).await.unwrap();

        let health = Health {
            app_id: task.app_id.clone(),
            task_id: task.id.clone(),
            timestamp: "later".to_string(),
            alive: true,
        };
        mirror.update_health(&health).await.unwrap();

        let raw = kv.get(&task.key()).await.unwrap().unwrap();
        let stored: Task = serde_json::from_slice(&raw).unwrap();
        assert!(stored.is_healthy());
        assert_eq!(
            Task {
                health_check_results: Vec::new(),
                ..stored
            },
            task
        );
    }

    #[tokio::test]
    async fn update_health_names_corrupt_task_record() {
        let (kv, mirror) = mirror("marathon");
        let task = test_task();
        let key = format!("marathon/{}", task.key());
        kv.put(&key, b"{not json".to_vec()).await.unwrap();

        let health = Health {
            app_id: task.app_id.clone(),
            task_id: task.id.clone(),
            timestamp: task.timestamp.clone(),
            alive: true,
        };
        match mirror.update_health(&health).await {
            Err(SyncError::Registry(RegistryError::Decode { key: bad, .. })) => {
                assert_eq!(bad, key)
            }
            other => panic!("expected a decode error, got {:?}", other),
        }
        assert_eq!(kv.get(&key).await.unwrap(), Some(b"{not json".to_vec()));
    }
}
