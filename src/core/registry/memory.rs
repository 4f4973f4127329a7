use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::Registry;
use crate::core::error::RegistryError;

/// Process-local registry. Backs the tests and `--registry-location memory`
/// dry runs.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn keys(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RegistryError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), RegistryError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
