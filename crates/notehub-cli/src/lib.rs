//! Helpers shared by the `notehub` binary.

use notehub_core::models::NoteRecord;

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// One line per note for list output.
pub fn note_line(note: &NoteRecord) -> String {
    format!(
        "{}  {:<32}  {:<16}  {:>4} likes  {:>4} downloads  {}",
        note.id,
        truncate_string(&note.title, 32),
        truncate_string(&note.subject, 16),
        note.like_count,
        note.download_count,
        note.file_kind
    )
}

/// Initialize tracing for the CLI binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("notehub=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use notehub_core::models::FileKind;
    use uuid::Uuid;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_counts_characters() {
        assert_eq!(truncate_string("thermodynamique é", 9), "thermo...");
        assert_eq!(truncate_string("ééé", 3), "ééé");
    }

    #[test]
    fn note_line_includes_counts_and_kind() {
        let note = NoteRecord {
            id: Uuid::nil(),
            owner_id: "u1".into(),
            title: "Optics diagrams".into(),
            description: None,
            subject: "Physics".into(),
            semester: None,
            branch: None,
            tags: vec![],
            storage_path: "u1/1_photo.png".into(),
            remote_url: "https://cdn.test/u1/1_photo.png".into(),
            file_kind: FileKind::Image,
            like_count: 4,
            download_count: 12,
            created_at: Utc::now(),
        };
        let line = note_line(&note);
        assert!(line.starts_with("00000000-0000-0000-0000-000000000000"));
        assert!(line.contains("Optics diagrams"));
        assert!(line.contains("4 likes"));
        assert!(line.contains("12 downloads"));
        assert!(line.ends_with("image"));
    }
}
