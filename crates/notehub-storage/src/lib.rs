//! NoteHub Storage Library
//!
//! Object-storage abstraction for note files, with backends for the Supabase
//! storage REST API, S3-compatible endpoints and the local filesystem.
//!
//! # Storage path format
//!
//! Every backend stores objects under the same owner-scoped layout:
//! `{owner_id}/{millisecond_timestamp}_{sanitized_file_name}`. Paths are
//! derived in the `keys` module and never contain `..` segments or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
#[cfg(feature = "storage-supabase")]
pub mod supabase;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{derive_storage_path, sanitize_file_name};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use notehub_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
#[cfg(feature = "storage-supabase")]
pub use supabase::SupabaseStorage;
pub use traits::{ObjectStorage, StorageError, StorageResult};
