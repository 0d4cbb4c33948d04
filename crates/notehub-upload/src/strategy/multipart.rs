use super::{StrategyError, UploadPayload, UploadStrategy};
use async_trait::async_trait;
use notehub_core::constants::UPLOAD_CACHE_CONTROL;
use notehub_core::{Config, NoteError, NoteResult, SessionProvider};
use notehub_storage::{ObjectStorage, StorageError};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Posts the file as a `multipart/form-data` body straight to the storage
/// REST endpoint, bypassing the storage client.
pub struct MultipartFormStrategy {
    client: Client,
    storage_url: String,
    bucket: String,
    api_key: String,
    session: Arc<dyn SessionProvider>,
    storage: Arc<dyn ObjectStorage>,
}

impl MultipartFormStrategy {
    pub fn new(
        storage_url: impl Into<String>,
        bucket: impl Into<String>,
        api_key: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        storage: Arc<dyn ObjectStorage>,
        timeout: Duration,
    ) -> NoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NoteError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            storage_url: storage_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_key: api_key.into(),
            session,
            storage,
        })
    }

    pub fn from_config(
        config: &Config,
        storage: Arc<dyn ObjectStorage>,
        session: Arc<dyn SessionProvider>,
    ) -> NoteResult<Self> {
        Self::new(
            config.storage_api_url(),
            config.notes_bucket.clone(),
            config.supabase_anon_key.clone(),
            session,
            storage,
            config.network_timeout(),
        )
    }

    fn object_url(&self, path: &str) -> String {
        let encoded = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/object/{}/{}", self.storage_url, self.bucket, encoded)
    }
}

#[async_trait]
impl UploadStrategy for MultipartFormStrategy {
    fn name(&self) -> &'static str {
        "multipart_form"
    }

    async fn upload(&self, payload: &UploadPayload) -> Result<String, StrategyError> {
        let token = self
            .session
            .access_token()
            .await
            .map_err(|e| StrategyError::Unauthorized(e.to_string()))?;

        let file_part = Part::bytes(payload.data.to_vec())
            .file_name(payload.file_name().to_string())
            .mime_str(&payload.content_type)
            .map_err(|e| StrategyError::Rejected(format!("invalid content type: {}", e)))?;
        let form = Form::new()
            .text("cacheControl", UPLOAD_CACHE_CONTROL)
            .part("file", file_part);

        let response = self
            .client
            .post(self.object_url(&payload.storage_path))
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .header("x-upsert", "false")
            .multipart(form)
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
            "Multipart upload accepted"
        );
        Ok(self.storage.public_url(&payload.storage_path))
    }
}
