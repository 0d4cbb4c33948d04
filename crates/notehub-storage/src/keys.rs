//! Shared path generation for storage backends.
//!
//! Path format: `{owner_id}/{millisecond_timestamp}_{sanitized_file_name}`.

use std::sync::atomic::{AtomicI64, Ordering};

/// Last timestamp handed out by `derive_storage_path`.
static LAST_TIMESTAMP_MS: AtomicI64 = AtomicI64::new(0);

/// Lowercase the name and collapse every run of characters other than ASCII
/// letters, digits and `.` into a single `_`.
///
/// `"My Notes (v2).PDF"` becomes `"my_notes_v2_.pdf"`.
pub fn sanitize_file_name(raw: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '.' {
            sanitized.push(c);
            in_run = false;
        } else if !in_run {
            sanitized.push('_');
            in_run = true;
        }
    }

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return "file".to_string();
    }
    sanitized
}

/// Derive the storage path for a new upload.
///
/// The timestamp is the wall clock in milliseconds, bumped when needed so that
/// no two calls in this process ever get the same value. Two uploads of the
/// same file name by the same owner therefore always land on different paths.
pub fn derive_storage_path(owner_id: &str, raw_file_name: &str) -> String {
    format!(
        "{}/{}_{}",
        owner_id,
        next_timestamp_ms(),
        sanitize_file_name(raw_file_name)
    )
}

fn next_timestamp_ms() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let previous = LAST_TIMESTAMP_MS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    now.max(previous + 1)
}
