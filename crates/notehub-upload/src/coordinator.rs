//! Note operations that keep object storage and the record store consistent.
//!
//! Orderings that matter:
//! - create: upload, then insert; a failed insert removes the new object.
//! - update with a file: upload, then update; the old object is removed only
//!   after the update succeeded, the new one if it failed.
//! - delete: storage first (best effort), then the row.
//! - download: fetch, then bump the counter once; a failed bump is logged.

use crate::classifier::{classify, reject_declared_unsupported};
use crate::connectivity::{ConnectivityProbe, HttpConnectivityProbe};
use crate::materialize::BlobMaterializer;
use crate::strategy::UploadStrategyChain;
use bytes::Bytes;
use notehub_core::models::{
    FileReference, NewNote, NoteCounter, NoteFilters, NoteMetadata, NoteOrder, NoteRecord,
    NoteUpdate, Profile, UploadResult, UserIdentity,
};
use notehub_core::{Config, NoteError, NoteResult, SessionProvider};
use notehub_db::{create_record_stores, NoteStore, ProfileStore, RecordStoreError};
use notehub_storage::{create_storage, derive_storage_path, ObjectStorage};
use std::sync::Arc;
use uuid::Uuid;

/// Entry point for every note operation.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct NoteCoordinator {
    session: Arc<dyn SessionProvider>,
    storage: Arc<dyn ObjectStorage>,
    notes: Arc<dyn NoteStore>,
    profiles: Arc<dyn ProfileStore>,
    probe: Arc<dyn ConnectivityProbe>,
    materializer: BlobMaterializer,
    chain: UploadStrategyChain,
}

impl NoteCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<dyn SessionProvider>,
        storage: Arc<dyn ObjectStorage>,
        notes: Arc<dyn NoteStore>,
        profiles: Arc<dyn ProfileStore>,
        probe: Arc<dyn ConnectivityProbe>,
        materializer: BlobMaterializer,
        chain: UploadStrategyChain,
    ) -> Self {
        Self {
            session,
            storage,
            notes,
            profiles,
            probe,
            materializer,
            chain,
        }
    }

    /// Wire up every collaborator from configuration.
    pub async fn from_config(config: &Config, session: Arc<dyn SessionProvider>) -> NoteResult<Self> {
        let storage = create_storage(config, session.clone()).await?;
        let stores = create_record_stores(config, session.clone()).await?;
        let chain = UploadStrategyChain::standard(config, storage.clone(), session.clone())?;
        let probe = Arc::new(HttpConnectivityProbe::from_config(config)?);
        let materializer = BlobMaterializer::from_config(config)?;

        tracing::info!(
            storage_backend = %config.storage_backend,
            record_backend = %config.record_backend,
            strategies = ?chain.strategy_names(),
            "Note coordinator initialized"
        );

        Ok(Self::new(
            session,
            storage,
            stores.notes,
            stores.profiles,
            probe,
            materializer,
            chain,
        ))
    }

    /// Upload a file for the signed-in user and return where it landed.
    ///
    /// Runs the connectivity check, reads the file, classifies it and hands
    /// it to the strategy chain. Nothing is sent to storage for an empty or
    /// unsupported file, and a declared unsupported type is refused before
    /// the file is read.
    pub async fn upload_file(&self, file: FileReference) -> NoteResult<UploadResult> {
        let user = self.session.current_user().await?;
        self.upload_for(&user, file).await
    }

    async fn upload_for(&self, user: &UserIdentity, file: FileReference) -> NoteResult<UploadResult> {
        if !self.probe.is_connected().await {
            return Err(NoteError::NoConnectivity);
        }
        reject_declared_unsupported(&file)?;

        let data = self.materializer.materialize(&file).await?;
        let classification = classify(
            file.declared_content_type(),
            file.declared_name(),
            Some(&data[..]),
        )?;

        let file_name = file
            .declared_name()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_file_name(&classification.content_type));
        let storage_path = derive_storage_path(&user.id, &file_name);

        tracing::debug!(
            user_id = %user.id,
            storage_path = %storage_path,
            content_type = %classification.content_type,
            size_bytes = data.len(),
            "Uploading note file"
        );

        self.chain
            .upload(
                data,
                &storage_path,
                &classification.content_type,
                classification.kind,
            )
            .await
    }

    /// Upload `file` and create the note record pointing at it.
    #[tracing::instrument(skip(self, metadata, file), fields(note.title = %metadata.title))]
    pub async fn create_note_with_file(
        &self,
        metadata: NoteMetadata,
        file: FileReference,
    ) -> NoteResult<NoteRecord> {
        let start = std::time::Instant::now();
        let user = self.session.current_user().await?;
        self.ensure_profile(&user).await;

        let upload = self.upload_for(&user, file).await?;
        let storage_path = upload.storage_path.clone();
        let new_note = NewNote::from_upload(&user.id, metadata, upload);

        match self.notes.insert_note(&new_note).await {
            Ok(note) => {
                tracing::info!(
                    note_id = %note.id,
                    user_id = %user.id,
                    storage_path = %note.storage_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Note created"
                );
                Ok(note)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    storage_path = %storage_path,
                    "Failed to save note record, removing uploaded file"
                );
                let compensated = self.remove_object(&storage_path).await;
                Err(NoteError::RecordWrite {
                    message: e.to_string(),
                    compensated,
                })
            }
        }
    }

    /// Create a note for a file uploaded earlier with `upload_file`.
    pub async fn create_note(&self, metadata: NoteMetadata, upload: UploadResult) -> NoteResult<NoteRecord> {
        let user = self.session.current_user().await?;
        self.ensure_profile(&user).await;

        let new_note = NewNote::from_upload(&user.id, metadata, upload);
        self.notes
            .insert_note(&new_note)
            .await
            .map_err(|e| NoteError::RecordWrite {
                message: e.to_string(),
                compensated: false,
            })
    }

    /// Change note metadata. File fields in `patch` are ignored; use
    /// `update_note_with_file` to replace the file.
    pub async fn update_note(&self, id: Uuid, mut patch: NoteUpdate) -> NoteResult<NoteRecord> {
        let (user, _) = self.owned_note(id).await?;

        patch.storage_path = None;
        patch.remote_url = None;
        patch.file_kind = None;

        let note = self.notes.update_note(id, &user.id, &patch).await?;
        tracing::info!(note_id = %id, user_id = %user.id, "Note updated");
        Ok(note)
    }

    /// Replace the file behind a note, optionally changing metadata too.
    #[tracing::instrument(skip(self, patch, file), fields(note.id = %id))]
    pub async fn update_note_with_file(
        &self,
        id: Uuid,
        patch: NoteUpdate,
        file: FileReference,
    ) -> NoteResult<NoteRecord> {
        let (user, existing) = self.owned_note(id).await?;

        let upload = self.upload_for(&user, file).await?;
        let new_path = upload.storage_path.clone();
        let patch = patch.with_upload(&upload);

        let note = match self.notes.update_note(id, &user.id, &patch).await {
            Ok(note) => note,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    note_id = %id,
                    storage_path = %new_path,
                    "Failed to update note record, removing replacement file"
                );
                let compensated = self.remove_object(&new_path).await;
                return Err(NoteError::RecordWrite {
                    message: e.to_string(),
                    compensated,
                });
            }
        };

        if existing.storage_path != new_path {
            if let Err(e) = self.storage.delete(&existing.storage_path).await {
                tracing::warn!(
                    error = %e,
                    storage_path = %existing.storage_path,
                    "Failed to delete replaced note file"
                );
            }
        }

        tracing::info!(
            note_id = %id,
            old_path = %existing.storage_path,
            new_path = %new_path,
            "Note file replaced"
        );
        Ok(note)
    }

    /// Delete a note owned by the signed-in user.
    ///
    /// The stored file is removed first; when that fails the row is still
    /// deleted and the orphaned object is only logged.
    pub async fn delete_note(&self, id: Uuid) -> NoteResult<()> {
        let (user, existing) = self.owned_note(id).await?;

        if let Err(e) = self.storage.delete(&existing.storage_path).await {
            tracing::warn!(
                error = %e,
                note_id = %id,
                storage_path = %existing.storage_path,
                "Failed to delete note file, deleting record anyway"
            );
        }

        if !self.notes.delete_note(id, &user.id).await? {
            return Err(NoteError::NotFound(id.to_string()));
        }

        tracing::info!(note_id = %id, user_id = %user.id, "Note deleted");
        Ok(())
    }

    /// Fetch the file behind a note and count the download.
    pub async fn download_note_file(&self, id: Uuid) -> NoteResult<Bytes> {
        let note = self.get_note(id).await?;
        let data = self.storage.get(&note.storage_path).await?;

        if let Err(e) = self
            .notes
            .increment_counter(id, NoteCounter::Downloads)
            .await
        {
            tracing::warn!(error = %e, note_id = %id, "Failed to increment download count");
        }

        tracing::debug!(note_id = %id, size_bytes = data.len(), "Note file downloaded");
        Ok(data)
    }

    /// Like a note; returns the new like count.
    pub async fn like_note(&self, id: Uuid) -> NoteResult<u64> {
        self.session.current_user().await?;
        let likes = self.notes.increment_counter(id, NoteCounter::Likes).await?;
        tracing::debug!(note_id = %id, likes, "Note liked");
        Ok(likes)
    }

    pub async fn get_note(&self, id: Uuid) -> NoteResult<NoteRecord> {
        self.notes
            .get_note(id)
            .await?
            .ok_or_else(|| NoteError::NotFound(id.to_string()))
    }

    /// Notes matching `filters`, newest first.
    pub async fn list_notes(&self, filters: &NoteFilters, limit: Option<u32>) -> NoteResult<Vec<NoteRecord>> {
        Ok(self.notes.list_notes(filters, NoteOrder::Recent, limit).await?)
    }

    /// Notes of the signed-in user, newest first.
    pub async fn my_notes(&self) -> NoteResult<Vec<NoteRecord>> {
        let user = self.session.current_user().await?;
        let filters = NoteFilters {
            owner_id: Some(user.id),
            ..Default::default()
        };
        Ok(self.notes.list_notes(&filters, NoteOrder::Recent, None).await?)
    }

    /// Most liked, then most downloaded notes.
    pub async fn trending_notes(&self, limit: u32) -> NoteResult<Vec<NoteRecord>> {
        Ok(self
            .notes
            .list_notes(&NoteFilters::default(), NoteOrder::Trending, Some(limit))
            .await?)
    }

    /// Signed-in user plus the note, which must belong to them.
    async fn owned_note(&self, id: Uuid) -> NoteResult<(UserIdentity, NoteRecord)> {
        let user = self.session.current_user().await?;
        let note = self.get_note(id).await?;
        if !note.is_owned_by(&user.id) {
            tracing::debug!(note_id = %id, user_id = %user.id, "Rejected change to another user's note");
            return Err(NoteError::Forbidden(format!(
                "note {} belongs to another user",
                id
            )));
        }
        Ok((user, note))
    }

    /// Make sure the owner's profile row exists before a note references it.
    ///
    /// Failures are logged only; the note insert reports the real problem if
    /// the row is still missing.
    async fn ensure_profile(&self, user: &UserIdentity) {
        match self.profiles.find_profile(&user.id).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user.id, "Profile lookup failed");
            }
        }

        let profile = Profile::minimal(user.id.clone());
        match self.profiles.insert_profile(&profile).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "Created profile");
            }
            Err(RecordStoreError::Constraint(_)) => {
                tracing::debug!(user_id = %user.id, "Profile already exists");
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user.id, "Profile insert failed, trying upsert");
                if let Err(e) = self.profiles.upsert_profile(&profile).await {
                    tracing::warn!(error = %e, user_id = %user.id, "Profile upsert failed");
                }
            }
        }
    }

    /// Delete an object, reporting whether it is gone.
    async fn remove_object(&self, path: &str) -> bool {
        match self.storage.delete(path).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    storage_path = %path,
                    "Failed to delete orphaned file"
                );
                false
            }
        }
    }
}

/// Name used when the picker gave none: `note.pdf`, `note.png`, ...
fn fallback_file_name(content_type: &str) -> String {
    let extension = content_type
        .rsplit_once('/')
        .map(|(_, subtype)| subtype)
        .filter(|s| !s.is_empty())
        .unwrap_or("bin");
    format!("note.{}", extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_file_name() {
        assert_eq!(fallback_file_name("application/pdf"), "note.pdf");
        assert_eq!(fallback_file_name("image/jpeg"), "note.jpeg");
        assert_eq!(fallback_file_name("weird"), "note.bin");
    }
}
