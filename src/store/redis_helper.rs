use async_trait::async_trait;
use redis::AsyncCommands;

use super::{StoreBackend, StoreError};

/// Keeps each namespace snapshot under a single Redis string key.
pub struct RedisBackend {
    client: redis::Client,
    key_prefix: String,
}

impl RedisBackend {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    async fn get_conn(&self) -> Result<redis::aio::Connection, StoreError> {
        self.client
            .get_async_connection()
            .await
            .map_err(StoreError::Redis)
    }

    fn key(&self, namespace: &str) -> String {
        format!("{}:{}", self.key_prefix, namespace)
    }
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn read_namespace(&self, namespace: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(self.key(namespace)).await?;
        Ok(value)
    }

    async fn write_namespace(&self, namespace: &str, snapshot: String) -> Result<(), StoreError> {
        let mut conn = self.get_conn().await?;
        conn.set::<_, _, ()>(self.key(namespace), snapshot).await?;
        Ok(())
    }
}
