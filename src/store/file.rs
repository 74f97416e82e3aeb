use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{StoreBackend, StoreError};

/// One `<namespace>.json` file per namespace under `root`.
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        let file_name: String = namespace
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", file_name))
    }
}

#[async_trait]
impl StoreBackend for FileBackend {
    async fn read_namespace(&self, namespace: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read(self.path_for(namespace)).await {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    namespace: namespace.to_string(),
                    reason: e.to_string(),
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_namespace(&self, namespace: &str, snapshot: String) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;

        // Private staging file per write, persisted over the target.
        let root = self.root.clone();
        let target = self.path_for(namespace);
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut staging = tempfile::NamedTempFile::new_in(&root)?;
            staging.write_all(snapshot.as_bytes())?;
            staging.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }
}
