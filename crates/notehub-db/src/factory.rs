#[cfg(feature = "postgres")]
use crate::PgRecordStore;
#[cfg(feature = "rest")]
use crate::RestRecordStore;
use crate::{NoteStore, ProfileStore, RecordResult, RecordStoreError};
use notehub_core::{Config, RecordBackend, SessionProvider};
use std::sync::Arc;

/// Note and profile repositories sharing one backend connection.
#[derive(Clone)]
pub struct RecordStores {
    pub notes: Arc<dyn NoteStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl RecordStores {
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: NoteStore + ProfileStore + 'static,
    {
        Self {
            notes: store.clone(),
            profiles: store,
        }
    }
}

/// Create the record store based on configuration
pub async fn create_record_stores(
    config: &Config,
    session: Arc<dyn SessionProvider>,
) -> RecordResult<RecordStores> {
    match config.record_backend {
        #[cfg(feature = "rest")]
        RecordBackend::Rest => {
            let store = RestRecordStore::from_config(config, session)?;
            Ok(RecordStores::from_shared(Arc::new(store)))
        }

        #[cfg(not(feature = "rest"))]
        RecordBackend::Rest => {
            let _ = session;
            Err(RecordStoreError::Config(
                "REST record backend not available (rest feature not enabled)".to_string(),
            ))
        }

        #[cfg(feature = "postgres")]
        RecordBackend::Postgres => {
            let database_url = config.database_url.as_deref().ok_or_else(|| {
                RecordStoreError::Config("DATABASE_URL not configured".to_string())
            })?;
            let store = PgRecordStore::connect(database_url, config.network_timeout()).await?;
            Ok(RecordStores::from_shared(Arc::new(store)))
        }

        #[cfg(not(feature = "postgres"))]
        RecordBackend::Postgres => Err(RecordStoreError::Config(
            "Postgres record backend not available (postgres feature not enabled)".to_string(),
        )),
    }
}
