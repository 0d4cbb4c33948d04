use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::file::{FileKind, UploadResult};

/// A shared note: metadata plus the storage object backing it.
///
/// `remote_url` / `storage_path` reference an object that exists in storage
/// for as long as the record exists. Field names on the wire follow the
/// `notes` table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub semester: Option<String>,
    pub branch: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    pub storage_path: String,
    #[serde(rename = "file_url")]
    pub remote_url: String,
    #[serde(rename = "file_type")]
    pub file_kind: FileKind,
    #[serde(rename = "likes", default)]
    pub like_count: u64,
    #[serde(rename = "downloads", default)]
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
}

impl NoteRecord {
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// Caller-supplied metadata for a new note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub semester: Option<String>,
    pub branch: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NoteMetadata {
    pub fn new(title: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Row inserted into the `notes` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNote {
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub semester: Option<String>,
    pub branch: Option<String>,
    pub tags: Vec<String>,
    pub storage_path: String,
    #[serde(rename = "file_url")]
    pub remote_url: String,
    #[serde(rename = "file_type")]
    pub file_kind: FileKind,
}

impl NewNote {
    pub fn from_upload(owner_id: &str, metadata: NoteMetadata, upload: UploadResult) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            title: metadata.title,
            description: metadata.description,
            subject: metadata.subject,
            semester: metadata.semester,
            branch: metadata.branch,
            tags: metadata.tags,
            storage_path: upload.storage_path,
            remote_url: upload.remote_url,
            file_kind: upload.file_kind,
        }
    }
}

/// Partial update of a note. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(rename = "file_url", skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(rename = "file_type", skip_serializing_if = "Option::is_none")]
    pub file_kind: Option<FileKind>,
}

impl NoteUpdate {
    /// Patch carrying new metadata and a replacement file.
    pub fn with_upload(mut self, upload: &UploadResult) -> Self {
        self.storage_path = Some(upload.storage_path.clone());
        self.remote_url = Some(upload.remote_url.clone());
        self.file_kind = Some(upload.file_kind);
        self
    }

    /// Whether the patch would replace the backing file.
    pub fn touches_file(&self) -> bool {
        self.storage_path.is_some() || self.remote_url.is_some() || self.file_kind.is_some()
    }

    /// Apply the patch to a record in place.
    pub fn apply_to(&self, note: &mut NoteRecord) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(description) = &self.description {
            note.description = Some(description.clone());
        }
        if let Some(subject) = &self.subject {
            note.subject = subject.clone();
        }
        if let Some(semester) = &self.semester {
            note.semester = Some(semester.clone());
        }
        if let Some(branch) = &self.branch {
            note.branch = Some(branch.clone());
        }
        if let Some(tags) = &self.tags {
            note.tags = tags.clone();
        }
        if let Some(path) = &self.storage_path {
            note.storage_path = path.clone();
        }
        if let Some(url) = &self.remote_url {
            note.remote_url = url.clone();
        }
        if let Some(kind) = self.file_kind {
            note.file_kind = kind;
        }
    }
}

impl From<NoteMetadata> for NoteUpdate {
    fn from(metadata: NoteMetadata) -> Self {
        Self {
            title: Some(metadata.title),
            description: metadata.description,
            subject: Some(metadata.subject),
            semester: metadata.semester,
            branch: metadata.branch,
            tags: Some(metadata.tags),
            ..Default::default()
        }
    }
}

/// Filters for listing notes. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteFilters {
    pub owner_id: Option<String>,
    pub subject: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<String>,
    /// Matches notes sharing at least one tag
    #[serde(default)]
    pub tags: Vec<String>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
}

impl NoteFilters {
    pub fn matches(&self, note: &NoteRecord) -> bool {
        if let Some(owner) = &self.owner_id {
            if &note.owner_id != owner {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if &note.subject != subject {
                return false;
            }
        }
        if let Some(branch) = &self.branch {
            if note.branch.as_ref() != Some(branch) {
                return false;
            }
        }
        if let Some(semester) = &self.semester {
            if note.semester.as_ref() != Some(semester) {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| note.tags.contains(t)) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = note.title.to_lowercase().contains(&needle);
            let in_description = note
                .description
                .as_ref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

/// Sort order for note listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteOrder {
    /// Newest first
    #[default]
    Recent,
    /// Most liked first, ties broken by downloads
    Trending,
}

/// Server-side counters on a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteCounter {
    Likes,
    Downloads,
}

impl NoteCounter {
    pub fn column(&self) -> &'static str {
        match self {
            NoteCounter::Likes => "likes",
            NoteCounter::Downloads => "downloads",
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
