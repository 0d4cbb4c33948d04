//! Identity/session seam.
//!
//! The session is shared read-only state across concurrent operations. Token
//! refresh happens behind `access_token`, so callers never see an expired
//! token unless the refresh itself failed.

use async_trait::async_trait;

use crate::error::NoteResult;
use crate::models::UserIdentity;

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The signed-in user. Fails with `NoteError::Unauthenticated` when there is none.
    async fn current_user(&self) -> NoteResult<UserIdentity>;

    /// A bearer token valid for at least the next network call.
    async fn access_token(&self) -> NoteResult<String>;
}
