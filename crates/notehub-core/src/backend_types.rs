use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Object-storage backend types
///
/// Defined in core because configuration selects it and the storage factory
/// dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Supabase,
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Supabase => write!(f, "supabase"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

/// Record-store backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordBackend {
    /// PostgREST over HTTP (the backend's row API)
    Rest,
    /// Direct Postgres connection
    Postgres,
}

impl FromStr for RecordBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rest" | "postgrest" => Ok(RecordBackend::Rest),
            "postgres" | "postgresql" => Ok(RecordBackend::Postgres),
            _ => Err(anyhow::anyhow!("Invalid record backend: {}", s)),
        }
    }
}

impl Display for RecordBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RecordBackend::Rest => write!(f, "rest"),
            RecordBackend::Postgres => write!(f, "postgres"),
        }
    }
}
