use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::redis::RedisHandle;

/// Named string blobs read and written whole.
#[async_trait]
pub(crate) trait BlobStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn read(&self, key: &str) -> Result<Option<String>>;

    async fn write(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Default)]
pub(crate) struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.blobs.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per blob. Writes go to a temporary file that is then
/// renamed over the target, so readers never observe a partial blob.
pub(crate) struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let tmp = temp_path(&path);
        tokio::fs::write(&tmp, value)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err).with_context(|| format!("Failed to replace {}", path.display()));
        }
        Ok(())
    }
}

pub(crate) struct RedisBlobStore {
    redis: RedisHandle,
}

impl RedisBlobStore {
    pub(crate) fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl BlobStore for RedisBlobStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.redis.get_string(key).await.context("Failed to read blob from Redis")
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.redis.set_string(key, value).await.context("Failed to write blob to Redis")
    }
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if !valid {
        bail!("invalid blob key '{key}'");
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(format!(".tmp-{}", Uuid::new_v4()));
    path.with_file_name(name)
}
