//! In-memory collaborators with failure switches and a shared operation log.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use notehub_core::models::{
    NewNote, NoteCounter, NoteFilters, NoteOrder, NoteRecord, NoteUpdate, Profile,
};
use notehub_db::{NoteStore, ProfileStore, RecordResult, RecordStoreError};
use notehub_storage::{ObjectStorage, StorageBackend, StorageError, StorageResult};
use notehub_upload::{StrategyError, UploadPayload, UploadStrategy};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Ordered record of the side effects of storage and record-store calls.
#[derive(Clone, Default)]
pub struct OpLog(Arc<Mutex<Vec<String>>>);

impl OpLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Index of the first entry starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }
}

pub const PUBLIC_BASE: &str = "https://storage.test/object/public/notes";

pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    log: OpLog,
    pub put_calls: AtomicUsize,
    pub fail_puts: AtomicBool,
    pub reject_puts: AtomicBool,
    pub fail_deletes: AtomicBool,
    /// Number of upcoming puts that store the object but report a reset
    pub lost_responses: AtomicUsize,
}

impl MemoryStorage {
    pub fn new(log: OpLog) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            log,
            put_calls: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
            reject_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            lost_responses: AtomicUsize::new(0),
        }
    }

    pub fn object(&self, path: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(path).map(|(data, _)| data.clone())
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects.lock().unwrap().get(path).map(|(_, ct)| ct.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected("HTTP 413: payload too large".into()));
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Transport("connection reset".into()));
        }
        {
            let mut objects = self.objects.lock().unwrap();
            if objects.contains_key(path) {
                return Err(StorageError::from_status(
                    409,
                    r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#,
                ));
            }
            objects.insert(path.to_string(), (data, content_type.to_string()));
        }
        self.log.push(format!("storage.put {}", path));
        let lost = self
            .lost_responses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Err(StorageError::Transport("connection reset by peer".into()));
        }
        Ok(self.public_url(path))
    }

    async fn get(&self, path: &str) -> StorageResult<Bytes> {
        self.object(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            self.log.push(format!("storage.delete_failed {}", path));
            return Err(StorageError::DeleteFailed("HTTP 500".into()));
        }
        self.objects.lock().unwrap().remove(path);
        self.log.push(format!("storage.delete {}", path));
        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(path))
    }

    async fn create_signed_upload_url(
        &self,
        _path: &str,
        _content_type: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::ConfigError("signing not supported".into()))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", PUBLIC_BASE, path)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

pub struct MemoryNoteStore {
    notes: Mutex<HashMap<Uuid, NoteRecord>>,
    log: OpLog,
    pub fail_inserts: AtomicBool,
    pub fail_updates: AtomicBool,
    pub fail_counters: AtomicBool,
    pub counter_calls: AtomicUsize,
}

impl MemoryNoteStore {
    pub fn new(log: OpLog) -> Self {
        Self {
            notes: Mutex::new(HashMap::new()),
            log,
            fail_inserts: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fail_counters: AtomicBool::new(false),
            counter_calls: AtomicUsize::new(0),
        }
    }

    pub fn note(&self, id: Uuid) -> Option<NoteRecord> {
        self.notes.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.notes.lock().unwrap().len()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn insert_note(&self, note: &NewNote) -> RecordResult<NoteRecord> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            self.log.push("notes.insert_failed");
            return Err(RecordStoreError::Transport("HTTP 503".into()));
        }
        let record = NoteRecord {
            id: Uuid::new_v4(),
            owner_id: note.owner_id.clone(),
            title: note.title.clone(),
            description: note.description.clone(),
            subject: note.subject.clone(),
            semester: note.semester.clone(),
            branch: note.branch.clone(),
            tags: note.tags.clone(),
            storage_path: note.storage_path.clone(),
            remote_url: note.remote_url.clone(),
            file_kind: note.file_kind,
            like_count: 0,
            download_count: 0,
            created_at: Utc::now(),
        };
        self.notes.lock().unwrap().insert(record.id, record.clone());
        self.log.push(format!("notes.insert {}", record.id));
        Ok(record)
    }

    async fn get_note(&self, id: Uuid) -> RecordResult<Option<NoteRecord>> {
        Ok(self.note(id))
    }

    async fn update_note(
        &self,
        id: Uuid,
        owner_id: &str,
        patch: &NoteUpdate,
    ) -> RecordResult<NoteRecord> {
        if self.fail_updates.load(Ordering::SeqCst) {
            self.log.push("notes.update_failed");
            return Err(RecordStoreError::Transport("HTTP 503".into()));
        }
        let mut notes = self.notes.lock().unwrap();
        let note = notes
            .get_mut(&id)
            .filter(|n| n.owner_id == owner_id)
            .ok_or_else(|| RecordStoreError::NotFound(id.to_string()))?;
        patch.apply_to(note);
        self.log.push(format!("notes.update {}", id));
        Ok(note.clone())
    }

    async fn delete_note(&self, id: Uuid, owner_id: &str) -> RecordResult<bool> {
        let mut notes = self.notes.lock().unwrap();
        let owned = notes.get(&id).is_some_and(|n| n.owner_id == owner_id);
        if owned {
            notes.remove(&id);
            self.log.push(format!("notes.delete {}", id));
        }
        Ok(owned)
    }

    async fn list_notes(
        &self,
        filters: &NoteFilters,
        order: NoteOrder,
        limit: Option<u32>,
    ) -> RecordResult<Vec<NoteRecord>> {
        let mut notes: Vec<NoteRecord> = self
            .notes
            .lock()
            .unwrap()
            .values()
            .filter(|n| filters.matches(n))
            .cloned()
            .collect();
        match order {
            NoteOrder::Recent => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            NoteOrder::Trending => notes.sort_by(|a, b| {
                (b.like_count, b.download_count).cmp(&(a.like_count, a.download_count))
            }),
        }
        if let Some(limit) = limit {
            notes.truncate(limit as usize);
        }
        Ok(notes)
    }

    async fn increment_counter(&self, id: Uuid, counter: NoteCounter) -> RecordResult<u64> {
        self.counter_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_counters.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Transport("rpc unavailable".into()));
        }
        let mut notes = self.notes.lock().unwrap();
        let note = notes
            .get_mut(&id)
            .ok_or_else(|| RecordStoreError::NotFound(id.to_string()))?;
        let value = match counter {
            NoteCounter::Likes => {
                note.like_count += 1;
                note.like_count
            }
            NoteCounter::Downloads => {
                note.download_count += 1;
                note.download_count
            }
        };
        Ok(value)
    }
}

pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, Profile>>,
    pub fail_finds: AtomicBool,
    pub fail_inserts: AtomicBool,
    pub fail_upserts: AtomicBool,
    pub upsert_calls: AtomicUsize,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            fail_finds: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
            fail_upserts: AtomicBool::new(false),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.lock().unwrap().contains_key(id)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_profile(&self, id: &str) -> RecordResult<Option<Profile>> {
        if self.fail_finds.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Transport("HTTP 503".into()));
        }
        Ok(self.profiles.lock().unwrap().get(id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> RecordResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Unauthorized("row-level security".into()));
        }
        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&profile.id) {
            return Err(RecordStoreError::Constraint("duplicate key".into()));
        }
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn upsert_profile(&self, profile: &Profile) -> RecordResult<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Transport("HTTP 503".into()));
        }
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}

/// Strategy that replays scripted outcomes and records when it was called.
///
/// Once the script runs out every call fails with a transport error.
pub struct ScriptedStrategy {
    name: &'static str,
    script: Mutex<VecDeque<Result<String, StrategyError>>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<tokio::time::Instant>>,
    log: OpLog,
}

impl ScriptedStrategy {
    pub fn new(name: &'static str, log: OpLog) -> Self {
        Self {
            name,
            script: Mutex::new(VecDeque::new()),
            delay: None,
            calls: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn then(self, outcome: Result<&str, StrategyError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(outcome.map(str::to_string));
        self
    }

    /// Every call sleeps this long before answering.
    pub fn hanging(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn upload(&self, payload: &UploadPayload) -> Result<String, StrategyError> {
        self.calls.lock().unwrap().push(tokio::time::Instant::now());
        self.log.push(format!("{} {}", self.name, payload.storage_path));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(StrategyError::Transport("scripted failure".into())))
    }
}
