//! NoteHub Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration
//! shared by the storage, record-store and upload crates.

pub mod backend_types;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use backend_types::{RecordBackend, StorageBackend};
pub use config::Config;
pub use error::{ErrorMetadata, LogLevel, NoteError, NoteResult};
pub use session::SessionProvider;
