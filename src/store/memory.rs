use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreBackend, StoreError};

/// Process-local backend. Share one instance between several
/// [`KvStore`](super::KvStore)s to model independent role apps over the same
/// browser storage.
#[derive(Default)]
pub struct MemoryBackend {
    namespaces: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn read_namespace(&self, namespace: &str) -> Result<Option<String>, StoreError> {
        Ok(self.namespaces.read().await.get(namespace).cloned())
    }

    async fn write_namespace(&self, namespace: &str, snapshot: String) -> Result<(), StoreError> {
        self.namespaces
            .write()
            .await
            .insert(namespace.to_string(), snapshot);
        Ok(())
    }
}
