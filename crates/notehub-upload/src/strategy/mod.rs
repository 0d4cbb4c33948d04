//! Upload strategies and the chain that tries them in order.
//!
//! Each strategy is attempted under the retry policy, with every attempt
//! bounded by the per-call timeout. Transport failures and timeouts are
//! retried; once a strategy gives up the chain moves to the next one. A
//! rejection by the backend (validation, unsupported type, size) ends the
//! chain immediately since weaker strategies would be refused the same way.
//!
//! A transport failure or timeout does not prove the object was not stored.
//! After one, a conflict on the same path is checked against storage and
//! counted as success when the object is there, and a chain that gives up
//! removes whatever may have landed.

mod multipart;
mod native;
mod presigned;

pub use multipart::MultipartFormStrategy;
pub use native::NativeSdkStrategy;
pub use presigned::PresignedPutStrategy;

use crate::retry::RetryPolicy;
use async_trait::async_trait;
use bytes::Bytes;
use notehub_core::models::{FileKind, UploadResult};
use notehub_core::{Config, NoteError, NoteResult, SessionProvider, StorageBackend};
use notehub_storage::{ObjectStorage, StorageError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single strategy attempt
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend refused the content itself
    #[error("rejected: {0}")]
    Rejected(String),

    /// Something is already stored at the target path
    #[error("conflict: {0}")]
    Conflict(String),

    /// The strategy cannot work against this backend or configuration
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl StrategyError {
    /// Retried within the same strategy
    pub fn is_retryable(&self) -> bool {
        matches!(self, StrategyError::Transport(_) | StrategyError::Timeout(_))
    }

    /// Ends the whole chain
    pub fn is_terminal(&self) -> bool {
        matches!(self, StrategyError::Rejected(_) | StrategyError::Conflict(_))
    }
}

impl From<StorageError> for StrategyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Transport(msg) => StrategyError::Transport(msg),
            StorageError::Unauthorized(msg) => StrategyError::Unauthorized(msg),
            StorageError::Rejected(msg) | StorageError::InvalidKey(msg) => {
                StrategyError::Rejected(msg)
            }
            StorageError::AlreadyExists(msg) => StrategyError::Conflict(msg),
            other => StrategyError::Unavailable(other.to_string()),
        }
    }
}

/// Everything a strategy needs to store one object
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub data: Bytes,
    pub storage_path: String,
    pub content_type: String,
    pub file_kind: FileKind,
}

impl UploadPayload {
    /// File name part of the storage path
    pub fn file_name(&self) -> &str {
        self.storage_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.storage_path)
    }
}

/// One way of getting bytes into object storage
#[async_trait]
pub trait UploadStrategy: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Store the payload and return its remote URL
    async fn upload(&self, payload: &UploadPayload) -> Result<String, StrategyError>;
}

/// Ordered strategies tried one after another until one succeeds
#[derive(Clone)]
pub struct UploadStrategyChain {
    strategies: Vec<Arc<dyn UploadStrategy>>,
    retry: RetryPolicy,
    timeout: Duration,
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl UploadStrategyChain {
    pub fn new(strategies: Vec<Arc<dyn UploadStrategy>>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            strategies,
            retry,
            timeout,
            storage: None,
        }
    }

    /// Storage the strategies write to. Used to confirm a conflict after an
    /// uncertain attempt and to clean up after a failed upload; without it
    /// a conflict is always terminal.
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Native upload, then multipart POST (storage REST API only), then a
    /// pre-signed PUT.
    pub fn standard(
        config: &Config,
        storage: Arc<dyn ObjectStorage>,
        session: Arc<dyn SessionProvider>,
    ) -> NoteResult<Self> {
        let mut strategies: Vec<Arc<dyn UploadStrategy>> =
            vec![Arc::new(NativeSdkStrategy::new(storage.clone()))];

        if config.storage_backend == StorageBackend::Supabase {
            strategies.push(Arc::new(MultipartFormStrategy::from_config(
                config,
                storage.clone(),
                session,
            )?));
        }

        strategies.push(Arc::new(PresignedPutStrategy::new(
            storage.clone(),
            config.signed_upload_expiry(),
            config.network_timeout(),
        )?));

        Ok(Self::new(
            strategies,
            RetryPolicy::from_config(config),
            config.network_timeout(),
        )
        .with_storage(storage))
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Upload `data` to `storage_path`.
    ///
    /// Fails with `UploadExhausted` once every strategy has given up, or as
    /// soon as one strategy reports a rejection.
    pub async fn upload(
        &self,
        data: Bytes,
        storage_path: &str,
        content_type: &str,
        file_kind: FileKind,
    ) -> NoteResult<UploadResult> {
        let payload = UploadPayload {
            data,
            storage_path: storage_path.to_string(),
            content_type: content_type.to_string(),
            file_kind,
        };

        let mut last_error: Option<StrategyError> = None;
        // Set once an attempt ended without a definite answer from the backend.
        let may_have_landed = AtomicBool::new(false);

        for (index, strategy) in self.strategies.iter().enumerate() {
            let start = std::time::Instant::now();
            let result = self
                .retry
                .run_if(
                    strategy.name(),
                    |attempt| self.attempt(strategy.as_ref(), &payload, attempt, &may_have_landed),
                    StrategyError::is_retryable,
                )
                .await;

            match result {
                Ok(remote_url) => {
                    tracing::info!(
                        strategy = strategy.name(),
                        storage_path = %payload.storage_path,
                        size_bytes = payload.data.len(),
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Upload succeeded"
                    );
                    return Ok(UploadResult {
                        remote_url,
                        storage_path: payload.storage_path,
                        file_kind,
                    });
                }
                Err(e) if e.is_terminal() => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %e,
                        storage_path = %payload.storage_path,
                        "Upload rejected by backend, not trying other strategies"
                    );
                    self.discard(&payload, &may_have_landed).await;
                    return Err(NoteError::UploadExhausted {
                        strategies: index + 1,
                        last_error: e.to_string(),
                        rejected: true,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %e,
                        storage_path = %payload.storage_path,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Upload strategy failed, falling through"
                    );
                    last_error = Some(e);
                }
            }
        }

        tracing::error!(
            strategies = self.strategies.len(),
            storage_path = %payload.storage_path,
            "All upload strategies failed"
        );
        self.discard(&payload, &may_have_landed).await;
        Err(NoteError::UploadExhausted {
            strategies: self.strategies.len(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no upload strategies configured".to_string()),
            rejected: false,
        })
    }

    async fn attempt(
        &self,
        strategy: &dyn UploadStrategy,
        payload: &UploadPayload,
        attempt: u32,
        may_have_landed: &AtomicBool,
    ) -> Result<String, StrategyError> {
        tracing::debug!(
            strategy = strategy.name(),
            attempt,
            max_attempts = self.retry.max_attempts,
            "Upload attempt"
        );
        let result = match tokio::time::timeout(self.timeout, strategy.upload(payload)).await {
            Ok(result) => result,
            Err(_) => Err(StrategyError::Timeout(self.timeout)),
        };

        match result {
            Err(StrategyError::Conflict(detail)) if may_have_landed.load(Ordering::SeqCst) => {
                self.confirm_stored(strategy, payload, detail).await
            }
            Err(e) => {
                if e.is_retryable() {
                    may_have_landed.store(true, Ordering::SeqCst);
                }
                Err(e)
            }
            ok => ok,
        }
    }

    /// A conflict after an uncertain attempt: the object is ours if it is there.
    async fn confirm_stored(
        &self,
        strategy: &dyn UploadStrategy,
        payload: &UploadPayload,
        detail: String,
    ) -> Result<String, StrategyError> {
        let Some(storage) = &self.storage else {
            return Err(StrategyError::Conflict(detail));
        };

        match tokio::time::timeout(self.timeout, storage.exists(&payload.storage_path)).await {
            Ok(Ok(true)) => {
                tracing::info!(
                    strategy = strategy.name(),
                    storage_path = %payload.storage_path,
                    "Object from an earlier attempt is already stored"
                );
                Ok(storage.public_url(&payload.storage_path))
            }
            Ok(Ok(false)) => Err(StrategyError::Conflict(detail)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StrategyError::Timeout(self.timeout)),
        }
    }

    /// Best-effort removal of an object an uncertain attempt may have stored.
    async fn discard(&self, payload: &UploadPayload, may_have_landed: &AtomicBool) {
        let Some(storage) = &self.storage else {
            return;
        };
        if !may_have_landed.load(Ordering::SeqCst) {
            return;
        }

        match tokio::time::timeout(self.timeout, storage.delete(&payload.storage_path)).await {
            Ok(Ok(())) => tracing::debug!(
                storage_path = %payload.storage_path,
                "Removed object left by a failed upload"
            ),
            Ok(Err(e)) => tracing::warn!(
                error = %e,
                storage_path = %payload.storage_path,
                "Failed to remove object left by a failed upload"
            ),
            Err(_) => tracing::warn!(
                storage_path = %payload.storage_path,
                "Timed out removing object left by a failed upload"
            ),
        }
    }
}
