use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub const PROFILE_PHOTO_DIR: &str = "profile-photos";
pub const PENDING_UPLOAD_DIR: &str = "tmp-uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Object store keyed by relative paths such as `profile-photos/<name>.png`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under a fresh random name inside `dir` and returns its path.
    async fn put(&self, dir: &str, bytes: Vec<u8>, extension: &str) -> Result<String, StorageError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Removing a missing object succeeds.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, StorageError>;

    /// Paths of every object below `dir`, nested ones included.
    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError>;

    fn url(&self, path: &str) -> String;
}

pub fn object_name(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), extension)
}

/// Rejects absolute paths and parent traversal.
pub fn check_path(path: &str) -> Result<(), StorageError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if bad {
        Err(StorageError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

pub fn public_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        check_path(path)?;
        Ok(self.root.join(path))
    }
}

fn not_found(path: &str, err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl ObjectStorage for LocalDiskStorage {
    async fn put(&self, dir: &str, bytes: Vec<u8>, extension: &str) -> Result<String, StorageError> {
        let path = format!("{dir}/{}", object_name(extension));
        let target = self.resolve(&path)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::debug!(path = %path, "stored object");
        Ok(path)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target).await.map_err(|err| not_found(path, err))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;

        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                tracing::debug!(path = %path, "deleted object");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, StorageError> {
        let target = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(|err| not_found(path, err))?;

        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let mut pending = vec![dir.to_string()];
        let mut paths = Vec::new();

        while let Some(current) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(self.resolve(&current)?).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let path = format!("{current}/{name}");

                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else {
                    paths.push(path);
                }
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn url(&self, path: &str) -> String {
        public_url(&self.public_url, path)
    }
}
