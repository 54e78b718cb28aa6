//! Blob Storage
//!
//! Proposal PDFs and post-grant reports live outside the document store.
//! Uploads are content-addressed: `pdfs/<sha256>/<file name>`, so two uploads
//! that share a file name never overwrite each other.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob reference: {0}")]
    InvalidRef(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Reference to an uploaded file, embedded in application and report documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub blob_ref: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store content under `key`, returning a reference URI
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, BlobStoreError>;

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError>;

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError>;

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError>;
}

/// Keep only characters that are safe in a path segment. Never empty.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn content_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

pub fn content_key(sha256: &str, file_name: &str) -> String {
    format!("pdfs/{}/{}", sha256, sanitize_file_name(file_name))
}

/// Decode a base64 payload. Empty or malformed payloads are rejected.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, BlobStoreError> {
    let trimmed = payload.trim();
    // Tolerate data URLs ("data:application/pdf;base64,....")
    let body = match trimmed.split_once(";base64,") {
        Some((prefix, body)) if prefix.starts_with("data:") => body,
        _ => trimmed,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body)
        .map_err(|e| BlobStoreError::InvalidRef(format!("malformed base64 payload: {e}")))?;
    if bytes.is_empty() {
        return Err(BlobStoreError::InvalidRef("empty file payload".into()));
    }
    Ok(bytes)
}

/// Hash, key and store an upload.
pub async fn store_upload(
    blobs: &dyn BlobStore,
    file_name: &str,
    content: &[u8],
    content_type: &str,
) -> Result<StoredFile, BlobStoreError> {
    let sha256 = content_sha256(content);
    let key = content_key(&sha256, file_name);
    let blob_ref = blobs.store(&key, content, content_type).await?;
    tracing::debug!(blob_ref = %blob_ref, size = content.len(), "stored upload");
    Ok(StoredFile {
        blob_ref,
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        size_bytes: content.len() as u64,
        sha256,
    })
}

/// Filesystem-backed store, rooted at `base_path`.
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path_for_key(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        if key.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            return Err(BlobStoreError::InvalidRef(format!("bad key: {key}")));
        }
        Ok(self.base_path.join(key))
    }

    fn path_from_ref(&self, blob_ref: &str) -> Result<PathBuf, BlobStoreError> {
        blob_ref
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| {
                BlobStoreError::InvalidRef(format!("Expected file:// prefix: {}", blob_ref))
            })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<String, BlobStoreError> {
        let path = self.path_for_key(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(format!("file://{}", path.display()))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(BlobStoreError::NotFound(blob_ref.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        let path = self.path_from_ref(blob_ref)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

/// Process-local store, used by the in-memory deployment and tests.
#[derive(Default, Clone)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(
        &self,
        key: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<String, BlobStoreError> {
        let blob_ref = format!("memory://{}", key);
        self.blobs
            .write()
            .await
            .insert(blob_ref.clone(), content.to_vec());
        Ok(blob_ref)
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobStoreError> {
        self.blobs
            .read()
            .await
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(blob_ref.to_string()))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), BlobStoreError> {
        self.blobs.write().await.remove(blob_ref);
        Ok(())
    }

    async fn exists(&self, blob_ref: &str) -> Result<bool, BlobStoreError> {
        Ok(self.blobs.read().await.contains_key(blob_ref))
    }
}
