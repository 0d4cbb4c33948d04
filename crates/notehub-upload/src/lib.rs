//! NoteHub upload pipeline
//!
//! Takes a user-selected file, gets it into object storage over an unreliable
//! network and keeps the note record consistent with the stored object.
//!
//! The pipeline for a new note is:
//! connectivity probe, materialization, classification, path derivation,
//! upload strategy chain (each strategy retried with backoff), record insert,
//! and a compensating delete when the insert fails.

pub mod classifier;
pub mod connectivity;
pub mod coordinator;
pub mod materialize;
pub mod retry;
pub mod session;
pub mod strategy;

pub use classifier::{classify, reject_declared_unsupported, Classification};
pub use connectivity::{ConnectivityProbe, HttpConnectivityProbe, StaticConnectivity};
pub use coordinator::NoteCoordinator;
pub use materialize::BlobMaterializer;
pub use retry::RetryPolicy;
pub use session::{StaticSession, SupabaseSession};
pub use strategy::{
    MultipartFormStrategy, NativeSdkStrategy, PresignedPutStrategy, StrategyError, UploadPayload,
    UploadStrategy, UploadStrategyChain,
};
