use super::{StrategyError, UploadPayload, UploadStrategy};
use async_trait::async_trait;
use notehub_storage::ObjectStorage;
use std::sync::Arc;

/// Uploads through the configured storage client
pub struct NativeSdkStrategy {
    storage: Arc<dyn ObjectStorage>,
}

impl NativeSdkStrategy {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl UploadStrategy for NativeSdkStrategy {
    fn name(&self) -> &'static str {
        "native_sdk"
    }

    async fn upload(&self, payload: &UploadPayload) -> Result<String, StrategyError> {
        self.storage
            .put(
                &payload.storage_path,
                payload.data.clone(),
                &payload.content_type,
            )
            .await
            .map_err(StrategyError::from)
    }
}
