use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Canonical kind of an uploaded note file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
        }
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(FileKind::Pdf),
            "image" => Ok(FileKind::Image),
            other => Err(format!("unknown file kind: {}", other)),
        }
    }
}

/// Handle to a user-selected file.
///
/// Either the bytes are already in memory, or only a platform-local URI is
/// known and the bytes must be materialized before upload. A reference is
/// consumed by the upload operation that receives it.
#[derive(Debug)]
pub enum FileReference {
    Bytes {
        data: Bytes,
        content_type: Option<String>,
        name: Option<String>,
    },
    Uri {
        uri: String,
        content_type: Option<String>,
        name: Option<String>,
    },
}

impl FileReference {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        FileReference::Bytes {
            data: data.into(),
            content_type: None,
            name: None,
        }
    }

    pub fn from_uri(uri: impl Into<String>) -> Self {
        FileReference::Uri {
            uri: uri.into(),
            content_type: None,
            name: None,
        }
    }

    pub fn with_content_type(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            FileReference::Bytes { content_type, .. } | FileReference::Uri { content_type, .. } => {
                *content_type = Some(value.into())
            }
        }
        self
    }

    pub fn with_name(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            FileReference::Bytes { name, .. } | FileReference::Uri { name, .. } => {
                *name = Some(value.into())
            }
        }
        self
    }

    /// Declared MIME type, if the picker reported one.
    pub fn declared_content_type(&self) -> Option<&str> {
        match self {
            FileReference::Bytes { content_type, .. } | FileReference::Uri { content_type, .. } => {
                content_type.as_deref().filter(|s| !s.trim().is_empty())
            }
        }
    }

    /// Declared file name; for URI references without one, the last path segment of the URI.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            FileReference::Bytes { name, .. } => name.as_deref().filter(|s| !s.is_empty()),
            FileReference::Uri { uri, name, .. } => name
                .as_deref()
                .filter(|s| !s.is_empty())
                .or_else(|| uri_file_name(uri)),
        }
    }
}

/// Last non-empty path segment of a URI, without query string or fragment.
fn uri_file_name(uri: &str) -> Option<&str> {
    let without_query = uri.split(['?', '#']).next().unwrap_or(uri);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.ends_with(':'))
}

/// Outcome of a successful upload. Becomes part of a `NoteRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub remote_url: String,
    pub storage_path: String,
    pub file_kind: FileKind,
}
