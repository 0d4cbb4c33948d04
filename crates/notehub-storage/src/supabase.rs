use crate::traits::{ObjectStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use notehub_core::constants::UPLOAD_CACHE_CONTROL;
use notehub_core::{Config, SessionProvider};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Object storage backed by the Supabase storage REST API.
///
/// Every request carries the project API key plus the caller's bearer token,
/// so bucket policies are evaluated as the signed-in user.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    storage_url: String,
    bucket: String,
    api_key: String,
    session: Arc<dyn SessionProvider>,
}

#[derive(Debug, Deserialize)]
struct SignedUploadResponse {
    url: String,
}

impl SupabaseStorage {
    /// Create a new SupabaseStorage instance
    ///
    /// # Arguments
    /// * `storage_url` - Base URL of the storage API, e.g. `https://xyz.supabase.co/storage/v1`
    /// * `bucket` - Bucket holding note files
    /// * `api_key` - Project API key sent as the `apikey` header
    /// * `session` - Source of the caller's access token
    /// * `timeout` - Per-request timeout
    pub fn new(
        storage_url: impl Into<String>,
        bucket: impl Into<String>,
        api_key: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(SupabaseStorage {
            client,
            storage_url: storage_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_key: api_key.into(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: Arc<dyn SessionProvider>) -> StorageResult<Self> {
        Self::new(
            config.storage_api_url(),
            config.notes_bucket.clone(),
            config.supabase_anon_key.clone(),
            session,
            config.network_timeout(),
        )
    }

    fn encode_path(path: &str) -> String {
        path.split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.storage_url,
            self.bucket,
            Self::encode_path(path)
        )
    }

    async fn authorized(&self, request: RequestBuilder) -> StorageResult<RequestBuilder> {
        let token = self
            .session
            .access_token()
            .await
            .map_err(|e| StorageError::Unauthorized(e.to_string()))?;
        Ok(request.bearer_auth(token).header("apikey", &self.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> StorageResult<Response> {
        request
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))
    }

    async fn error_from_response(response: Response) -> StorageError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StorageError::from_status(status, &body)
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let request = self
            .client
            .post(self.object_url(path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(
                reqwest::header::CACHE_CONTROL,
                format!("max-age={}", UPLOAD_CACHE_CONTROL),
            )
            .header("x-upsert", "false")
            .body(data);
        let response = self.send(self.authorized(request).await?).await?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            tracing::error!(
                error = %err,
                bucket = %self.bucket,
                path = %path,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Supabase storage upload failed"
            );
            return Err(err);
        }

        tracing::info!(
            bucket = %self.bucket,
            path = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Supabase storage upload successful"
        );

        Ok(self.public_url(path))
    }

    async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();
        let request = self.client.get(self.object_url(path));
        let response = self.send(self.authorized(request).await?).await?;

        if !response.status().is_success() {
            return Err(match Self::error_from_response(response).await {
                StorageError::NotFound(_) => StorageError::NotFound(path.to_string()),
                other => {
                    tracing::error!(
                        error = %other,
                        bucket = %self.bucket,
                        path = %path,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Supabase storage download failed"
                    );
                    other
                }
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            path = %path,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Supabase storage download successful"
        );

        Ok(bytes)
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let request = self.client.delete(self.object_url(path));
        let response = self.send(self.authorized(request).await?).await?;

        if !response.status().is_success() {
            match Self::error_from_response(response).await {
                StorageError::NotFound(_) => {
                    tracing::debug!(path = %path, "Object already absent");
                    return Ok(());
                }
                other => {
                    tracing::error!(
                        error = %other,
                        bucket = %self.bucket,
                        path = %path,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Supabase storage delete failed"
                    );
                    return Err(StorageError::DeleteFailed(other.to_string()));
                }
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            path = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Supabase storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let request = self.client.head(self.object_url(path));
        let response = self.send(self.authorized(request).await?).await?;

        match response.status().as_u16() {
            200..=299 => Ok(true),
            400 | 404 => Ok(false),
            _ => Err(Self::error_from_response(response).await),
        }
    }

    async fn create_signed_upload_url(
        &self,
        path: &str,
        _content_type: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        let url = format!(
            "{}/object/upload/sign/{}/{}",
            self.storage_url,
            self.bucket,
            Self::encode_path(path)
        );
        let response = self.send(self.authorized(self.client.post(url)).await?).await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let signed: SignedUploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid signed URL response: {}", e)))?;

        if signed.url.starts_with("http://") || signed.url.starts_with("https://") {
            Ok(signed.url)
        } else {
            Ok(format!("{}{}", self.storage_url, signed.url))
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.storage_url,
            self.bucket,
            Self::encode_path(path)
        )
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Supabase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notehub_core::models::UserIdentity;
    use notehub_core::{NoteError, NoteResult};

    struct FixedToken(Option<&'static str>);

    #[async_trait]
    impl SessionProvider for FixedToken {
        async fn current_user(&self) -> NoteResult<UserIdentity> {
            Ok(UserIdentity::new("u1"))
        }

        async fn access_token(&self) -> NoteResult<String> {
            self.0
                .map(String::from)
                .ok_or_else(|| NoteError::Unauthenticated("no session".into()))
        }
    }

    fn storage_for(server: &mockito::Server, token: Option<&'static str>) -> SupabaseStorage {
        SupabaseStorage::new(
            format!("{}/storage/v1", server.url()),
            "notes",
            "anon-key",
            Arc::new(FixedToken(token)),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_sends_auth_and_returns_public_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/storage/v1/object/notes/u1/1700000000000_photo.png")
            .match_header("authorization", "Bearer user-token")
            .match_header("apikey", "anon-key")
            .match_header("content-type", "image/png")
            .match_header("x-upsert", "false")
            .with_status(200)
            .with_body(r#"{"Key":"notes/u1/1700000000000_photo.png"}"#)
            .create_async()
            .await;

        let storage = storage_for(&server, Some("user-token"));
        let url = storage
            .put(
                "u1/1700000000000_photo.png",
                Bytes::from_static(b"\x89PNG"),
                "image/png",
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/notes/u1/1700000000000_photo.png",
                server.url()
            )
        );
    }

    #[tokio::test]
    async fn test_put_maps_server_errors_to_transport() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/storage/v1/object/notes/u1/1_a.pdf")
            .with_status(503)
            .create_async()
            .await;

        let storage = storage_for(&server, Some("t"));
        let err = storage
            .put("u1/1_a.pdf", Bytes::from_static(b"%PDF-"), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Transport(_)));
    }

    #[tokio::test]
    async fn test_put_without_session_is_unauthorized() {
        let server = mockito::Server::new_async().await;
        let storage = storage_for(&server, None);
        let err = storage
            .put("u1/1_a.pdf", Bytes::from_static(b"%PDF-"), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_delete_of_missing_object_succeeds() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/storage/v1/object/notes/u1/1_gone.pdf")
            .with_status(400)
            .with_body(r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#)
            .create_async()
            .await;

        let storage = storage_for(&server, Some("t"));
        assert!(storage.delete("u1/1_gone.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn test_get_returns_body_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/storage/v1/object/notes/u1/1_a.pdf")
            .with_status(200)
            .with_body("%PDF-1.7 body")
            .create_async()
            .await;

        let storage = storage_for(&server, Some("t"));
        let bytes = storage.get("u1/1_a.pdf").await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn test_signed_upload_url_is_made_absolute() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/storage/v1/object/upload/sign/notes/u1/1_a.pdf")
            .with_status(200)
            .with_body(r#"{"url":"/object/upload/sign/notes/u1/1_a.pdf?token=abc"}"#)
            .create_async()
            .await;

        let storage = storage_for(&server, Some("t"));
        let url = storage
            .create_signed_upload_url("u1/1_a.pdf", "application/pdf", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/upload/sign/notes/u1/1_a.pdf?token=abc",
                server.url()
            )
        );
    }

    #[test]
    fn test_public_url_encodes_segments() {
        let server_url = "https://project.supabase.co/storage/v1";
        let storage = SupabaseStorage::new(
            server_url,
            "notes",
            "k",
            Arc::new(FixedToken(Some("t"))),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            storage.public_url("u1/1_my notes.pdf"),
            "https://project.supabase.co/storage/v1/object/public/notes/u1/1_my%20notes.pdf"
        );
    }
}
