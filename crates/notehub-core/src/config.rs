//! Configuration module
//!
//! Backend endpoints, storage/record backend selection and the network
//! policy (timeouts, retry budget) used by the upload pipeline.

use std::env;
use std::time::Duration;

use crate::backend_types::{RecordBackend, StorageBackend};
use crate::constants::{
    CONNECTIVITY_PROBE_TIMEOUT_MS, DEFAULT_NOTES_BUCKET, DEFAULT_NOTES_TABLE,
    DEFAULT_PROFILES_TABLE, MAX_UPLOAD_RETRIES, NETWORK_TIMEOUT_SECS, RETRY_BASE_DELAY_MS,
    SIGNED_UPLOAD_EXPIRY_SECS,
};

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub notes_bucket: String,
    pub notes_table: String,
    pub profiles_table: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible endpoint (the backend's S3 gateway, MinIO, ...)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Record store configuration
    pub record_backend: RecordBackend,
    pub database_url: Option<String>,
    // Network policy
    pub network_timeout_secs: u64,
    pub max_upload_retries: u32,
    pub retry_base_delay_ms: u64,
    pub connectivity_probe_timeout_ms: u64,
    pub signed_upload_expiry_secs: u64,
    pub environment: String,
}

impl Config {
    /// Configuration for a Supabase project with every other setting at its default.
    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into().trim_end_matches('/').to_string(),
            supabase_anon_key: supabase_anon_key.into(),
            notes_bucket: DEFAULT_NOTES_BUCKET.to_string(),
            notes_table: DEFAULT_NOTES_TABLE.to_string(),
            profiles_table: DEFAULT_PROFILES_TABLE.to_string(),
            storage_backend: StorageBackend::Supabase,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
            record_backend: RecordBackend::Rest,
            database_url: None,
            network_timeout_secs: NETWORK_TIMEOUT_SECS,
            max_upload_retries: MAX_UPLOAD_RETRIES,
            retry_base_delay_ms: RETRY_BASE_DELAY_MS,
            connectivity_probe_timeout_ms: CONNECTIVITY_PROBE_TIMEOUT_MS,
            signed_upload_expiry_secs: SIGNED_UPLOAD_EXPIRY_SECS,
            environment: "development".to_string(),
        }
    }

    /// Load configuration from the process environment (and a `.env` file if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let supabase_url = lookup("SUPABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_URL must be set"))?;
        let supabase_anon_key = lookup("SUPABASE_ANON_KEY")
            .or_else(|| lookup("SUPABASE_KEY"))
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_ANON_KEY must be set"))?;

        let mut config = Config::new(supabase_url, supabase_anon_key);

        if let Some(bucket) = lookup("NOTES_BUCKET") {
            config.notes_bucket = bucket;
        }
        if let Some(table) = lookup("NOTES_TABLE") {
            config.notes_table = table;
        }
        if let Some(table) = lookup("PROFILES_TABLE") {
            config.profiles_table = table;
        }

        if let Some(backend) = lookup("STORAGE_BACKEND") {
            config.storage_backend = backend.parse()?;
        }
        config.s3_bucket = lookup("S3_BUCKET");
        config.s3_region = lookup("S3_REGION").or_else(|| lookup("AWS_REGION"));
        config.s3_endpoint = lookup("S3_ENDPOINT");
        config.local_storage_path = lookup("LOCAL_STORAGE_PATH");
        config.local_storage_base_url = lookup("LOCAL_STORAGE_BASE_URL");

        if let Some(backend) = lookup("RECORD_BACKEND") {
            config.record_backend = backend.parse()?;
        }
        config.database_url = lookup("DATABASE_URL");

        config.network_timeout_secs = lookup("NETWORK_TIMEOUT_SECS")
            .map(|s| s.parse())
            .transpose()
            .map_err(|_| anyhow::anyhow!("NETWORK_TIMEOUT_SECS must be a valid number"))?
            .unwrap_or(NETWORK_TIMEOUT_SECS);
        config.max_upload_retries = lookup("MAX_UPLOAD_RETRIES")
            .map(|s| s.parse())
            .transpose()
            .map_err(|_| anyhow::anyhow!("MAX_UPLOAD_RETRIES must be a valid number"))?
            .unwrap_or(MAX_UPLOAD_RETRIES);
        config.retry_base_delay_ms = lookup("RETRY_BASE_DELAY_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(RETRY_BASE_DELAY_MS);
        config.connectivity_probe_timeout_ms = lookup("CONNECTIVITY_PROBE_TIMEOUT_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(CONNECTIVITY_PROBE_TIMEOUT_MS);
        config.signed_upload_expiry_secs = lookup("SIGNED_UPLOAD_EXPIRY_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(SIGNED_UPLOAD_EXPIRY_SECS);
        config.environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.supabase_url.starts_with("http://") && !self.supabase_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "SUPABASE_URL must be an http(s) URL, got '{}'",
                self.supabase_url
            ));
        }
        if self.supabase_anon_key.trim().is_empty() {
            return Err(anyhow::anyhow!("SUPABASE_ANON_KEY cannot be empty"));
        }
        if self.notes_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("NOTES_BUCKET cannot be empty"));
        }
        if self.network_timeout_secs == 0 {
            return Err(anyhow::anyhow!("NETWORK_TIMEOUT_SECS must be greater than 0"));
        }
        if self.max_upload_retries == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_RETRIES must be at least 1"));
        }
        if self.connectivity_probe_timeout_ms == 0 {
            return Err(anyhow::anyhow!(
                "CONNECTIVITY_PROBE_TIMEOUT_MS must be greater than 0"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET is required when STORAGE_BACKEND=s3"));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION is required when STORAGE_BACKEND=s3"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL are required when STORAGE_BACKEND=local"
                    ));
                }
            }
            StorageBackend::Supabase => {}
        }

        if self.record_backend == RecordBackend::Postgres && self.database_url.is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL is required when RECORD_BACKEND=postgres"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn connectivity_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity_probe_timeout_ms)
    }

    pub fn signed_upload_expiry(&self) -> Duration {
        Duration::from_secs(self.signed_upload_expiry_secs)
    }

    /// Base URL of the object-storage REST API.
    pub fn storage_api_url(&self) -> String {
        format!("{}/storage/v1", self.supabase_url)
    }

    /// Base URL of the row API.
    pub fn rest_api_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    /// Base URL of the identity API.
    pub fn auth_api_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = Config::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://project.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.notes_bucket, "notes");
        assert_eq!(config.network_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_upload_retries, 3);
        assert_eq!(config.retry_base_delay(), Duration::from_millis(1000));
        assert_eq!(config.storage_backend, StorageBackend::Supabase);
        assert_eq!(config.record_backend, RecordBackend::Rest);
        assert_eq!(
            config.storage_api_url(),
            "https://project.supabase.co/storage/v1"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_url_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[("SUPABASE_ANON_KEY", "anon")]));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("NETWORK_TIMEOUT_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn validate_requires_backend_specific_settings() {
        let mut config = Config::new("https://project.supabase.co", "anon");
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());
        config.s3_bucket = Some("notes".into());
        config.s3_region = Some("us-east-1".into());
        assert!(config.validate().is_ok());

        config.record_backend = RecordBackend::Postgres;
        assert!(config.validate().is_err());
        config.database_url = Some("postgres://localhost/notes".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_retry_budget() {
        let mut config = Config::new("https://project.supabase.co", "anon");
        config.max_upload_retries = 0;
        assert!(config.validate().is_err());
    }
}
