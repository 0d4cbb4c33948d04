//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use notehub_core::NoteError;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidKey(String),

    /// Connection failure, timeout, or a server-side 5xx/408/429 answer
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend refused the request itself (validation, size, type)
    #[error("Rejected by storage backend: {0}")]
    Rejected(String),

    /// An object is already stored at the path and overwrites are refused
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Map a non-success HTTP answer from a storage endpoint.
    ///
    /// Some storage gateways answer a missing object with `400` and a
    /// `not_found` error body, so the body is inspected as well.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body)
        };
        let lowered = body.to_lowercase();
        match status {
            404 => StorageError::NotFound(detail),
            400 if lowered.contains("not_found") || lowered.contains("not found") => {
                StorageError::NotFound(detail)
            }
            401 | 403 => StorageError::Unauthorized(detail),
            408 | 429 | 500..=599 => StorageError::Transport(detail),
            409 => StorageError::AlreadyExists(detail),
            400 | 413 | 415 | 422 => StorageError::Rejected(detail),
            _ => StorageError::BackendError(detail),
        }
    }

    /// Whether the failure is worth retrying with the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transport(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for NoteError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => NoteError::NotFound(msg),
            StorageError::Transport(msg) => NoteError::Transport(msg),
            StorageError::Unauthorized(msg) => NoteError::Unauthenticated(msg),
            StorageError::ConfigError(msg) => NoteError::Config(msg),
            other => NoteError::Storage(other.to_string()),
        }
    }
}

/// Object storage abstraction trait
///
/// All storage backends (Supabase storage API, S3-compatible endpoints, local
/// filesystem) implement this trait so note operations never couple to a
/// specific backend. Paths are bucket-relative, e.g. `u1/1700000000000_photo.png`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` at `path` and return the object's public URL.
    ///
    /// Paths are unique per upload, so callers never rely on overwrite
    /// semantics; backends that refuse overwrites report `AlreadyExists`.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Fetch an object's bytes
    async fn get(&self, path: &str) -> StorageResult<Bytes>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Request a short-lived URL that accepts an HTTP PUT of the object's bytes
    /// without any further auth header.
    ///
    /// Backends without signed uploads return a `ConfigError`.
    async fn create_signed_upload_url(
        &self,
        path: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Public URL of the object at `path`. Does not check existence.
    fn public_url(&self, path: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
