//! File type inference.
//!
//! Platform pickers regularly report the wrong MIME type for binary files
//! (`text/plain` for a PDF is common), so a declared type is only trusted when
//! it is specific. Generic placeholders fall back to the file extension and
//! then to the payload's leading bytes.

use notehub_core::models::{FileKind, FileReference};
use notehub_core::{NoteError, NoteResult};

/// Declared MIME types that say nothing about the content.
const PLACEHOLDER_MIME_TYPES: &[&str] = &[
    "text/plain",
    "application/octet-stream",
    "binary/octet-stream",
    "application/unknown",
    "*/*",
];

/// Extension to canonical MIME type.
const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tiff", "image/tiff"),
    ("tif", "image/tiff"),
];

const PDF_MIME: &str = "application/pdf";

/// Canonical kind plus the content type to upload with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: FileKind,
    pub content_type: String,
}

impl Classification {
    fn pdf() -> Self {
        Self {
            kind: FileKind::Pdf,
            content_type: PDF_MIME.to_string(),
        }
    }

    fn image(content_type: &str) -> Self {
        Self {
            kind: FileKind::Image,
            content_type: content_type.to_string(),
        }
    }
}

/// Classify from the declared MIME type, the file name and, when available,
/// the payload bytes.
pub fn classify(
    declared_mime: Option<&str>,
    file_name: Option<&str>,
    payload: Option<&[u8]>,
) -> NoteResult<Classification> {
    if let Some(classification) = from_declared(declared_mime)? {
        return Ok(classification);
    }
    let mime = declared_mime.map(essence).filter(|m| !m.is_empty());

    if let Some(classification) = file_name.and_then(from_extension) {
        return Ok(classification);
    }

    if let Some(classification) = payload.and_then(from_magic_bytes) {
        return Ok(classification);
    }

    Err(NoteError::UnsupportedFileType(format!(
        "{} ({})",
        mime.as_deref().unwrap_or("no content type"),
        file_name.unwrap_or("unnamed file")
    )))
}

/// Refuse a reference whose declared type already rules it out, so its bytes
/// are never read or fetched. Placeholder or missing types pass.
pub fn reject_declared_unsupported(file: &FileReference) -> NoteResult<()> {
    from_declared(file.declared_content_type()).map(|_| ())
}

/// Verdict of a specific declared type; `None` when the type says nothing.
fn from_declared(declared_mime: Option<&str>) -> NoteResult<Option<Classification>> {
    let mime = declared_mime.map(essence).filter(|m| !m.is_empty());

    match mime.as_deref() {
        Some(PDF_MIME) => Ok(Some(Classification::pdf())),
        Some(m) if m.starts_with("image/") => {
            let canonical = if m == "image/jpg" { "image/jpeg" } else { m };
            Ok(Some(Classification::image(canonical)))
        }
        Some(m) if !PLACEHOLDER_MIME_TYPES.contains(&m) => {
            Err(NoteError::UnsupportedFileType(m.to_string()))
        }
        _ => Ok(None),
    }
}

/// MIME type without parameters, lowercased: `Text/Plain; charset=UTF-8` -> `text/plain`.
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn from_extension(name: &str) -> Option<Classification> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    if ext == "pdf" {
        return Some(Classification::pdf());
    }
    IMAGE_EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| Classification::image(mime))
}

fn from_magic_bytes(data: &[u8]) -> Option<Classification> {
    if data.starts_with(b"%PDF-") {
        Some(Classification::pdf())
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(Classification::image("image/jpeg"))
    } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(Classification::image("image/png"))
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some(Classification::image("image/gif"))
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(Classification::image("image/webp"))
    } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        Some(Classification::image("image/tiff"))
    } else if data.starts_with(b"BM") {
        Some(Classification::image("image/bmp"))
    } else {
        None
    }
}
