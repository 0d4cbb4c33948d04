//! Test helpers: in-memory backends and a coordinator wired to them.
//!
//! Run from workspace root: `cargo test -p notehub-upload`.

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

use fakes::{MemoryNoteStore, MemoryProfileStore, MemoryStorage, OpLog};
use notehub_core::models::UserIdentity;
use notehub_core::SessionProvider;
use notehub_upload::{
    BlobMaterializer, NativeSdkStrategy, NoteCoordinator, RetryPolicy, StaticConnectivity,
    StaticSession, UploadStrategy, UploadStrategyChain,
};
use std::sync::Arc;
use std::time::Duration;

pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinator plus handles on the fakes behind it.
pub struct TestApp {
    pub coordinator: NoteCoordinator,
    pub storage: Arc<MemoryStorage>,
    pub notes: Arc<MemoryNoteStore>,
    pub profiles: Arc<MemoryProfileStore>,
    pub log: OpLog,
    connected: bool,
}

impl TestApp {
    /// Signed in as `user_id` with the network up.
    pub fn signed_in(user_id: &str) -> Self {
        Self::build(session_for(Some(user_id)), true)
    }

    pub fn anonymous() -> Self {
        Self::build(session_for(None), true)
    }

    pub fn offline(user_id: &str) -> Self {
        Self::build(session_for(Some(user_id)), false)
    }

    fn build(session: Arc<dyn SessionProvider>, connected: bool) -> Self {
        let log = OpLog::default();
        let storage = Arc::new(MemoryStorage::new(log.clone()));
        let notes = Arc::new(MemoryNoteStore::new(log.clone()));
        let profiles = Arc::new(MemoryProfileStore::new());
        let coordinator = coordinator(session, &storage, &notes, &profiles, connected);

        Self {
            coordinator,
            storage,
            notes,
            profiles,
            log,
            connected,
        }
    }

    /// Another coordinator over the same backends acting as `user_id`.
    pub fn as_user(&self, user_id: &str) -> NoteCoordinator {
        coordinator(
            session_for(Some(user_id)),
            &self.storage,
            &self.notes,
            &self.profiles,
            self.connected,
        )
    }
}

fn session_for(user_id: Option<&str>) -> Arc<dyn SessionProvider> {
    match user_id {
        Some(id) => Arc::new(StaticSession::signed_in(
            UserIdentity::new(id),
            format!("token-{}", id),
        )),
        None => Arc::new(StaticSession::anonymous()),
    }
}

fn coordinator(
    session: Arc<dyn SessionProvider>,
    storage: &Arc<MemoryStorage>,
    notes: &Arc<MemoryNoteStore>,
    profiles: &Arc<MemoryProfileStore>,
    connected: bool,
) -> NoteCoordinator {
    let native: Arc<dyn UploadStrategy> = Arc::new(NativeSdkStrategy::new(storage.clone()));
    let chain = UploadStrategyChain::new(
        vec![native],
        RetryPolicy::new(3, Duration::ZERO),
        NETWORK_TIMEOUT,
    )
    .with_storage(storage.clone());

    NoteCoordinator::new(
        session,
        storage.clone(),
        notes.clone(),
        profiles.clone(),
        Arc::new(StaticConnectivity(connected)),
        BlobMaterializer::new(NETWORK_TIMEOUT).unwrap(),
        chain,
    )
}

/// Chain over the given strategies with the production retry policy.
pub fn chain_of(strategies: Vec<Arc<dyn UploadStrategy>>) -> UploadStrategyChain {
    UploadStrategyChain::new(strategies, RetryPolicy::default(), NETWORK_TIMEOUT)
}
