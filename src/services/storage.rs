use crate::error::{IngestError, Result as IngestResult};
use crate::models::PartitionKey;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Object storage capability: a single bucket addressed by key.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> Result<()>;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(())
    }
}

/// In-process bucket for dry runs and tests. Last write to a key wins.
#[derive(Default)]
pub struct MemoryStorageService {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn get_file(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No such key: {}", key))
    }

    pub async fn list_objects(&self, prefix: &str) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StorageService for MemoryStorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }
}

/// Routes staged files into `{partition}/{basename}` keys.
///
/// Keys are not namespaced by repository or run, so two files with the same
/// basename in one partition overwrite each other.
#[derive(Clone)]
pub struct StorageGateway {
    storage: Arc<dyn StorageService>,
}

impl StorageGateway {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    pub fn object_key(local_path: &Path, partition: PartitionKey) -> Option<String> {
        let file_name = local_path.file_name()?.to_string_lossy();
        Some(format!("{}/{}", partition.as_str(), file_name))
    }

    /// Uploads one file, exactly one attempt. Returns the object key on success.
    pub async fn upload(
        &self,
        local_path: &Path,
        partition: PartitionKey,
    ) -> IngestResult<String> {
        let key = Self::object_key(local_path, partition).ok_or_else(|| {
            IngestError::UploadFailed {
                path: local_path.to_path_buf(),
                key: partition.as_str().to_string(),
                reason: "path has no file name".to_string(),
            }
        })?;

        let failed = |reason: String| IngestError::UploadFailed {
            path: local_path.to_path_buf(),
            key: key.clone(),
            reason,
        };

        // only regular files under the staging root are published
        let meta = tokio::fs::symlink_metadata(local_path)
            .await
            .map_err(|e| failed(format!("read failed: {}", e)))?;
        if !meta.is_file() {
            return Err(failed("not a regular file".to_string()));
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| failed(format!("read failed: {}", e)))?;

        self.storage
            .upload_file(&key, data)
            .await
            .map_err(|e| failed(format!("{:#}", e)))?;

        tracing::debug!("Uploaded {} to {}", local_path.display(), key);
        Ok(key)
    }
}
