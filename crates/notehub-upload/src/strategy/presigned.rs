use super::{StrategyError, UploadPayload, UploadStrategy};
use async_trait::async_trait;
use notehub_core::{NoteError, NoteResult};
use notehub_storage::{ObjectStorage, StorageError};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Asks the backend for a short-lived signed upload URL and PUTs the raw
/// bytes to it. The signed URL carries its own authorization.
pub struct PresignedPutStrategy {
    client: Client,
    storage: Arc<dyn ObjectStorage>,
    expiry: Duration,
}

impl PresignedPutStrategy {
    pub fn new(storage: Arc<dyn ObjectStorage>, expiry: Duration, timeout: Duration) -> NoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NoteError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            storage,
            expiry,
        })
    }
}

#[async_trait]
impl UploadStrategy for PresignedPutStrategy {
    fn name(&self) -> &'static str {
        "presigned_put"
    }

    async fn upload(&self, payload: &UploadPayload) -> Result<String, StrategyError> {
        let signed_url = self
            .storage
            .create_signed_upload_url(&payload.storage_path, &payload.content_type, self.expiry)
            .await?;

        let response = self
            .client
            .put(&signed_url)
            .header(reqwest::header::CONTENT_TYPE, &payload.content_type)
            .body(payload.data.clone())
            .send()
            .await
            .map_err(|e| StrategyError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(status, &body).into());
        }

        tracing::debug!(
            path = %payload.storage_path,
            size_bytes = payload.data.len(),
            "Signed PUT upload accepted"
        );
        Ok(self.storage.public_url(&payload.storage_path))
    }
}
