//! Record store for notes and owner profiles
//!
//! Repositories are exposed through the `NoteStore` and `ProfileStore` traits
//! so the note operations can run against the backend's row API (PostgREST),
//! a direct Postgres connection, or in-memory fakes in tests.

pub mod factory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "rest")]
pub mod rest;
pub mod traits;

pub use factory::{create_record_stores, RecordStores};
#[cfg(feature = "postgres")]
pub use postgres::PgRecordStore;
#[cfg(feature = "rest")]
pub use rest::RestRecordStore;
pub use traits::{NoteStore, ProfileStore, RecordResult, RecordStoreError};
