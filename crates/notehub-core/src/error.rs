//! Error types module
//!
//! `NoteError` is the single error type that crosses the boundary of the note
//! operations. Lower layers (storage, record store, upload strategies) have
//! their own error enums; transient failures there are absorbed by the retry
//! and fallback layers, and only terminal kinds are converted into `NoteError`.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like an unsupported file
    Debug,
    /// Warning level - for recoverable issues like a lost connection
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPLOAD_EXHAUSTED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the whole operation later may succeed
    fn is_recoverable(&self) -> bool;

    /// Single human-readable message; never contains internal details
    fn user_message(&self) -> &'static str;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File fetch failed: {0}")]
    FileFetch(String),

    #[error("No network connectivity")]
    NoConnectivity,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upload failed after {strategies} strategies: {last_error}")]
    UploadExhausted {
        strategies: usize,
        last_error: String,
        /// The chain stopped because the backend refused the file itself
        rejected: bool,
    },

    #[error("Record write failed: {message}")]
    RecordWrite {
        message: String,
        /// Whether the just-uploaded object was removed again
        compensated: bool,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for note operations
pub type NoteResult<T> = Result<T, NoteError>;

impl From<anyhow::Error> for NoteError {
    fn from(err: anyhow::Error) -> Self {
        NoteError::Config(err.to_string())
    }
}

/// Static metadata for each variant: (error_code, recoverable, user_message, log_level).
fn note_error_static_metadata(err: &NoteError) -> (&'static str, bool, &'static str, LogLevel) {
    match err {
        NoteError::Unauthenticated(_) => (
            "UNAUTHENTICATED",
            false,
            "Authentication failed - please log in again",
            LogLevel::Debug,
        ),
        NoteError::UnsupportedFileType(_) => (
            "UNSUPPORTED_FILE_TYPE",
            false,
            "Unsupported file type. Only PDF and image files are supported.",
            LogLevel::Debug,
        ),
        NoteError::FileFetch(_) => (
            "FILE_FETCH_ERROR",
            false,
            "Could not read the selected file. Please select it again.",
            LogLevel::Warn,
        ),
        NoteError::NoConnectivity => (
            "NO_CONNECTIVITY",
            true,
            "No internet connection. Please check your network and try again.",
            LogLevel::Warn,
        ),
        NoteError::Transport(_) => (
            "TRANSPORT_ERROR",
            true,
            "Network connection issue - please check your internet connection",
            LogLevel::Warn,
        ),
        NoteError::UploadExhausted { rejected: true, .. } => (
            "UPLOAD_REJECTED",
            false,
            "The file was refused by storage. Check its size and type.",
            LogLevel::Warn,
        ),
        NoteError::UploadExhausted { .. } => (
            "UPLOAD_EXHAUSTED",
            true,
            "Upload failed because of a network connection issue. Please try again.",
            LogLevel::Error,
        ),
        NoteError::RecordWrite { .. } => (
            "RECORD_WRITE_ERROR",
            true,
            "The note could not be saved. Please try again.",
            LogLevel::Error,
        ),
        NoteError::NotFound(_) => ("NOT_FOUND", false, "Note not found", LogLevel::Debug),
        NoteError::Forbidden(_) => (
            "FORBIDDEN",
            false,
            "You do not have permission to change this note",
            LogLevel::Debug,
        ),
        NoteError::Storage(_) => (
            "STORAGE_ERROR",
            true,
            "Could not access file storage. Please try again.",
            LogLevel::Error,
        ),
        NoteError::RecordStore(_) => (
            "RECORD_STORE_ERROR",
            true,
            "Could not reach the notes service. Please try again.",
            LogLevel::Error,
        ),
        NoteError::Config(_) => (
            "CONFIG_ERROR",
            false,
            "The app is not configured correctly",
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for NoteError {
    fn error_code(&self) -> &'static str {
        note_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        note_error_static_metadata(self).1
    }

    fn user_message(&self) -> &'static str {
        note_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        note_error_static_metadata(self).3
    }
}
