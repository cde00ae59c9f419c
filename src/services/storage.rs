use std::path::{Component, Path, PathBuf};

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::{Settings, StorageBackend};

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("invalid storage key")]
    InvalidKey,
    #[error("object not found")]
    NotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object storage error: {0}")]
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredObject {
    pub(crate) key: String,
    pub(crate) size: u64,
    pub(crate) sha256: String,
}

#[derive(Debug, Clone)]
enum Backend {
    Local { root: PathBuf },
    S3 { client: Client, bucket: String },
}

/// Stores uploaded files either under a local directory or in an
/// S3-compatible bucket. Keys are always relative, slash separated paths.
#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    backend: Backend,
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        match settings.storage().backend {
            StorageBackend::Local => {
                let root = PathBuf::from(&settings.storage().upload_dir);
                tokio::fs::create_dir_all(&root).await?;
                Ok(Self::local(root))
            }
            StorageBackend::S3 => {
                let s3 = settings.s3();
                if s3.access_key.is_empty() || s3.secret_key.is_empty() {
                    anyhow::bail!("S3 storage selected but S3_ACCESS_KEY/S3_SECRET_KEY are empty");
                }

                let creds = Credentials::new(
                    s3.access_key.clone(),
                    s3.secret_key.clone(),
                    None,
                    None,
                    "portal-static",
                );

                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(aws_config::Region::new(s3.region.clone()))
                    .credentials_provider(creds);
                if !s3.endpoint.is_empty() {
                    loader = loader.endpoint_url(s3.endpoint.clone());
                }
                let config = loader.load().await;

                let client = Client::new(&config);
                Ok(Self { backend: Backend::S3 { client, bucket: s3.bucket.clone() } })
            }
        }
    }

    pub(crate) fn local(root: impl Into<PathBuf>) -> Self {
        Self { backend: Backend::Local { root: root.into() } }
    }

    pub(crate) fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Local { .. } => StorageBackend::Local.as_str(),
            Backend::S3 { .. } => StorageBackend::S3.as_str(),
        }
    }

    pub(crate) async fn put(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let key = sanitize_key(key)?;
        let size = bytes.len() as u64;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        match &self.backend {
            Backend::Local { root } => {
                let path = root.join(&key);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                // Write next to the target and rename so readers never see a partial file.
                let mut partial = path.clone().into_os_string();
                partial.push(".partial");
                tokio::fs::write(&partial, &bytes).await?;
                tokio::fs::rename(&partial, &path).await?;
            }
            Backend::S3 { client, bucket } => {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(&key)
                    .content_type(content_type)
                    .body(ByteStream::from(bytes))
                    .send()
                    .await
                    .map_err(|err| StorageError::Remote(err.to_string()))?;
            }
        }

        Ok(StoredObject { key, size, sha256 })
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let key = sanitize_key(key)?;

        match &self.backend {
            Backend::Local { root } => match tokio::fs::read(root.join(&key)).await {
                Ok(bytes) => Ok(bytes),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    Err(StorageError::NotFound)
                }
                Err(err) => Err(err.into()),
            },
            Backend::S3 { client, bucket } => {
                let response = client.get_object().bucket(bucket).key(&key).send().await;
                let output = match response {
                    Ok(output) => output,
                    Err(err) => {
                        if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                            return Err(StorageError::NotFound);
                        }
                        return Err(StorageError::Remote(err.to_string()));
                    }
                };
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|err| StorageError::Remote(err.to_string()))?;
                Ok(data.into_bytes().to_vec())
            }
        }
    }

    /// Removes an object. Deleting a missing object succeeds.
    pub(crate) async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key)?;

        match &self.backend {
            Backend::Local { root } => match tokio::fs::remove_file(root.join(&key)).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            },
            Backend::S3 { client, bucket } => {
                client
                    .delete_object()
                    .bucket(bucket)
                    .key(&key)
                    .send()
                    .await
                    .map_err(|err| StorageError::Remote(err.to_string()))?;
                Ok(())
            }
        }
    }

    /// Best-effort removal used after a database commit; failures are logged.
    pub(crate) async fn delete_all(&self, keys: &[String]) {
        for key in keys {
            if let Err(err) = self.delete(key).await {
                tracing::warn!(error = %err, key = %key, "Failed to delete stored object");
            }
        }
    }
}

pub(crate) fn sanitize_key(raw: &str) -> Result<String, StorageError> {
    let normalized = raw.trim().replace('\\', "/");
    if normalized.is_empty() || normalized.starts_with('/') {
        return Err(StorageError::InvalidKey);
    }
    if normalized.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey);
    }

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir
            | Component::ParentDir
            | Component::RootDir
            | Component::Prefix(_) => return Err(StorageError::InvalidKey),
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root() -> PathBuf {
        std::env::temp_dir().join(format!("portal-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn sanitize_rejects_traversal_and_absolute_keys() {
        for key in ["../secret", "a/../b", "/etc/passwd", "", "a//b", "./a", "a/./b"] {
            assert!(matches!(sanitize_key(key), Err(StorageError::InvalidKey)), "{key}");
        }
    }

    #[test]
    fn sanitize_normalizes_backslashes() {
        assert_eq!(sanitize_key("submissions\\1\\report.pdf").unwrap(), "submissions/1/report.pdf");
    }

    #[tokio::test]
    async fn local_put_get_delete_roundtrip() {
        let root = scratch_root();
        let storage = StorageService::local(&root);

        let stored = storage
            .put("assignments/7/brief.txt", "text/plain", b"hello".to_vec())
            .await
            .expect("put");
        assert_eq!(stored.key, "assignments/7/brief.txt");
        assert_eq!(stored.size, 5);
        assert_eq!(
            stored.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );

        let bytes = storage.get("assignments/7/brief.txt").await.expect("get");
        assert_eq!(bytes, b"hello");

        storage.delete("assignments/7/brief.txt").await.expect("delete");
        assert!(matches!(
            storage.get("assignments/7/brief.txt").await,
            Err(StorageError::NotFound)
        ));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn deleting_missing_object_is_ok() {
        let storage = StorageService::local(scratch_root());
        storage.delete("materials/none.pdf").await.expect("missing delete succeeds");
    }

    #[tokio::test]
    async fn local_put_rejects_escaping_key() {
        let storage = StorageService::local(scratch_root());
        let result = storage.put("../outside.txt", "text/plain", Vec::new()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey)));
        assert_eq!(storage.backend_name(), "local");
    }
}
