//! Namespaced JSON key-value store.
//!
//! A namespace is persisted as one JSON object (`{ key: value, ... }`). Every
//! read loads the whole snapshot and every write replaces it, so two
//! processes writing the same namespace resolve as last-writer-wins. Inside
//! one process, writes to a namespace are serialized through a per-namespace
//! lock, which gives read-your-writes and keeps single-entity patches atomic.

mod file;
mod memory;
mod redis_helper;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::core::AppError;

pub use self::file::FileBackend;
pub use self::memory::MemoryBackend;
pub use self::redis_helper::RedisBackend;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis connection error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Namespace `{namespace}` is corrupt: {reason}")]
    Corrupt { namespace: String, reason: String },
}

/// Raw snapshot persistence. Implementations only move strings around; all
/// JSON handling lives in [`KvStore`].
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// `Ok(None)` when the namespace has never been written.
    async fn read_namespace(&self, namespace: &str) -> Result<Option<String>, StoreError>;

    async fn write_namespace(&self, namespace: &str, snapshot: String) -> Result<(), StoreError>;
}

pub struct KvStore {
    backend: Arc<dyn StoreBackend>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KvStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    fn namespace_lock(&self, namespace: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Load a namespace snapshot. Absent or unparsable namespaces read as
    /// empty; only an unreachable backend is an error.
    async fn load(&self, namespace: &str) -> Result<Map<String, Value>, AppError> {
        let raw = match self.backend.read_namespace(namespace).await {
            Ok(raw) => raw,
            Err(StoreError::Corrupt { reason, .. }) => {
                tracing::warn!(namespace, %reason, "namespace unreadable, treating as empty");
                return Ok(Map::new());
            }
            Err(e) => return Err(e.into()),
        };

        let Some(raw) = raw else {
            return Ok(Map::new());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                tracing::warn!(namespace, "namespace snapshot is not an object, treating as empty");
                Ok(Map::new())
            }
            Err(e) => {
                tracing::warn!(namespace, error = %e, "namespace snapshot is corrupt, treating as empty");
                Ok(Map::new())
            }
        }
    }

    async fn persist(&self, namespace: &str, snapshot: &Map<String, Value>) -> Result<(), AppError> {
        let serialized = serde_json::to_string(snapshot)?;
        self.backend
            .write_namespace(namespace, serialized)
            .await
            .map_err(AppError::from)
    }

    fn decode<T: DeserializeOwned>(namespace: &str, key: &str, value: Value, default: T) -> T {
        match serde_json::from_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(namespace, key, error = %e, "stored value has unexpected shape, using default");
                default
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
        default: T,
    ) -> Result<T, AppError> {
        let mut snapshot = self.load(namespace).await?;
        match snapshot.remove(key) {
            Some(Value::Null) | None => Ok(default),
            Some(value) => Ok(Self::decode(namespace, key, value, default)),
        }
    }

    /// Overwrite one key. The whole namespace is rewritten.
    pub async fn set<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> Result<(), AppError> {
        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        let mut snapshot = self.load(namespace).await?;
        snapshot.insert(key.to_string(), serde_json::to_value(value)?);
        self.persist(namespace, &snapshot).await
    }

    /// Read-modify-write of one key under the namespace lock. Nothing is
    /// written when `apply` fails.
    pub async fn update<T, R, F>(
        &self,
        namespace: &str,
        key: &str,
        default: T,
        apply: F,
    ) -> Result<R, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R, AppError>,
    {
        self.update_snapshot(namespace, |snapshot| {
            let mut value = match snapshot.remove(key) {
                Some(Value::Null) | None => default,
                Some(v) => Self::decode(namespace, key, v, default),
            };

            let outcome = apply(&mut value)?;

            snapshot.insert(key.to_string(), serde_json::to_value(&value)?);
            Ok(outcome)
        })
        .await
    }

    /// Read-modify-write of the whole namespace under its lock, for changes
    /// that span several keys. Nothing is written when `apply` fails.
    pub async fn update_snapshot<R, F>(&self, namespace: &str, apply: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<R, AppError>,
    {
        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        let mut snapshot = self.load(namespace).await?;
        let outcome = apply(&mut snapshot)?;
        self.persist(namespace, &snapshot).await?;
        Ok(outcome)
    }

    pub fn namespace(self: &Arc<Self>, name: impl Into<String>) -> Store {
        Store {
            kv: Arc::clone(self),
            namespace: name.into(),
        }
    }
}

/// A [`KvStore`] bound to a single namespace. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    kv: Arc<KvStore>,
    namespace: String,
}

impl Store {
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Arc::new(KvStore::in_memory()).namespace(namespace)
    }

    pub fn name(&self) -> &str {
        &self.namespace
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, AppError> {
        self.kv.get(&self.namespace, key, default).await
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        self.kv.set(&self.namespace, key, value).await
    }

    pub async fn update<T, R, F>(&self, key: &str, default: T, apply: F) -> Result<R, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R, AppError>,
    {
        self.kv.update(&self.namespace, key, default, apply).await
    }

    pub async fn update_snapshot<R, F>(&self, apply: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<R, AppError>,
    {
        self.kv.update_snapshot(&self.namespace, apply).await
    }
}
