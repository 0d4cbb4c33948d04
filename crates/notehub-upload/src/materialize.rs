//! Turns any `FileReference` into an in-memory byte payload.

use bytes::Bytes;
use notehub_core::models::FileReference;
use notehub_core::{Config, NoteError, NoteResult};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

/// Reads URI-only file references into memory.
///
/// Supported sources: `file://` URIs, bare filesystem paths and `http(s)://`
/// URLs. An empty result is always an error; a zero-byte object is never a
/// valid upload.
#[derive(Clone)]
pub struct BlobMaterializer {
    client: Client,
}

impl BlobMaterializer {
    pub fn new(timeout: Duration) -> NoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NoteError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> NoteResult<Self> {
        Self::new(config.network_timeout())
    }

    /// In-memory references are returned as-is (the buffer is shared, not copied).
    pub async fn materialize(&self, file: &FileReference) -> NoteResult<Bytes> {
        let data = match file {
            FileReference::Bytes { data, .. } => data.clone(),
            FileReference::Uri { uri, .. } => self.read_uri(uri).await?,
        };

        if data.is_empty() {
            return Err(NoteError::FileFetch(
                "selected file is empty (0 bytes)".to_string(),
            ));
        }

        tracing::debug!(size_bytes = data.len(), "File materialized");
        Ok(data)
    }

    async fn read_uri(&self, uri: &str) -> NoteResult<Bytes> {
        match uri.split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("file") => {
                let decoded = urlencoding::decode(rest)
                    .map_err(|e| NoteError::FileFetch(format!("invalid file URI {}: {}", uri, e)))?;
                self.read_path(PathBuf::from(decoded.into_owned())).await
            }
            Some((scheme, _))
                if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
            {
                self.fetch(uri).await
            }
            Some((scheme, _)) => Err(NoteError::FileFetch(format!(
                "unsupported URI scheme '{}'",
                scheme
            ))),
            None => self.read_path(PathBuf::from(uri)).await,
        }
    }

    async fn read_path(&self, path: PathBuf) -> NoteResult<Bytes> {
        tokio::fs::read(&path).await.map(Bytes::from).map_err(|e| {
            tracing::warn!(error = %e, path = %path.display(), "Failed to read local file");
            NoteError::FileFetch(format!("could not read {}: {}", path.display(), e))
        })
    }

    async fn fetch(&self, url: &str) -> NoteResult<Bytes> {
        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(error = %e, url = %url, "Failed to fetch file");
            NoteError::FileFetch(format!("could not fetch {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(NoteError::FileFetch(format!(
                "fetching {} returned HTTP {}",
                url,
                response.status().as_u16()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| NoteError::FileFetch(format!("could not read body of {}: {}", url, e)))
    }
}
