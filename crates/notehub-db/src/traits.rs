use async_trait::async_trait;
use notehub_core::models::{
    NewNote, NoteCounter, NoteFilters, NoteOrder, NoteRecord, NoteUpdate, Profile,
};
use notehub_core::NoteError;
use thiserror::Error;
use uuid::Uuid;

/// Record store errors
#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Connection failure, timeout, or a 5xx from the row API
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unique, foreign-key or check constraint violated
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unexpected row data: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RecordStoreError {
    /// Map a non-success answer from the row API.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {}: {}", status, body);
        match status {
            401 | 403 => RecordStoreError::Unauthorized(detail),
            404 => RecordStoreError::NotFound(detail),
            408 | 429 | 500..=599 => RecordStoreError::Transport(detail),
            400 | 409 | 422 => RecordStoreError::Constraint(detail),
            _ => RecordStoreError::Database(detail),
        }
    }
}

/// Result type for record store operations
pub type RecordResult<T> = Result<T, RecordStoreError>;

impl From<RecordStoreError> for NoteError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::NotFound(msg) => NoteError::NotFound(msg),
            RecordStoreError::Transport(msg) => NoteError::Transport(msg),
            RecordStoreError::Unauthorized(msg) => NoteError::Unauthenticated(msg),
            RecordStoreError::Config(msg) => NoteError::Config(msg),
            other => NoteError::RecordStore(other.to_string()),
        }
    }
}

/// Note rows.
///
/// Mutations that take an `owner_id` only touch rows owned by it; a row that
/// exists but belongs to someone else behaves as missing.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert_note(&self, note: &NewNote) -> RecordResult<NoteRecord>;

    async fn get_note(&self, id: Uuid) -> RecordResult<Option<NoteRecord>>;

    /// Apply `patch` and return the updated row. `NotFound` if nothing matched.
    async fn update_note(
        &self,
        id: Uuid,
        owner_id: &str,
        patch: &NoteUpdate,
    ) -> RecordResult<NoteRecord>;

    /// Delete the row; returns whether a row was removed.
    async fn delete_note(&self, id: Uuid, owner_id: &str) -> RecordResult<bool>;

    async fn list_notes(
        &self,
        filters: &NoteFilters,
        order: NoteOrder,
        limit: Option<u32>,
    ) -> RecordResult<Vec<NoteRecord>>;

    /// Atomically add one to a counter on the server and return the new value.
    async fn increment_counter(&self, id: Uuid, counter: NoteCounter) -> RecordResult<u64>;
}

/// Owner profile rows
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, id: &str) -> RecordResult<Option<Profile>>;

    /// Plain insert; fails with `Constraint` when the row already exists.
    async fn insert_profile(&self, profile: &Profile) -> RecordResult<()>;

    /// Insert or merge on the primary key.
    async fn upsert_profile(&self, profile: &Profile) -> RecordResult<()>;
}
