//! Record store over a direct Postgres connection.

use crate::traits::{NoteStore, ProfileStore, RecordResult, RecordStoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notehub_core::models::{
    FileKind, NewNote, NoteCounter, NoteFilters, NoteOrder, NoteRecord, NoteUpdate, Profile,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row};
use std::time::Duration;
use uuid::Uuid;

const NOTE_COLUMNS: &str = "id, user_id, title, description, subject, semester, branch, tags, \
     storage_path, file_url, file_type, likes, downloads, created_at";

impl From<sqlx::Error> for RecordStoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RecordStoreError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation() =>
            {
                RecordStoreError::Constraint(db_err.to_string())
            }
            sqlx::Error::Io(e) => RecordStoreError::Transport(e.to_string()),
            sqlx::Error::PoolTimedOut => {
                RecordStoreError::Transport("connection pool timed out".to_string())
            }
            other => RecordStoreError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: Uuid,
    user_id: String,
    title: String,
    description: Option<String>,
    subject: String,
    semester: Option<String>,
    branch: Option<String>,
    tags: Vec<String>,
    storage_path: String,
    file_url: String,
    file_type: String,
    likes: i64,
    downloads: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<NoteRow> for NoteRecord {
    type Error = RecordStoreError;

    fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
        let file_kind: FileKind = row
            .file_type
            .parse()
            .map_err(RecordStoreError::Decode)?;

        Ok(NoteRecord {
            id: row.id,
            owner_id: row.user_id,
            title: row.title,
            description: row.description,
            subject: row.subject,
            semester: row.semester,
            branch: row.branch,
            tags: row.tags,
            storage_path: row.storage_path,
            remote_url: row.file_url,
            file_kind,
            like_count: row.likes.max(0) as u64,
            download_count: row.downloads.max(0) as u64,
            created_at: row.created_at,
        })
    }
}

/// Repository for notes and profiles in Postgres
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply the bundled migrations.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> RecordResult<Self> {
        tracing::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RecordStoreError::Config(format!("Failed to run migrations: {}", e)))?;
        tracing::info!("Database migrations applied");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl NoteStore for PgRecordStore {
    #[tracing::instrument(skip(self, note), fields(db.table = "notes", db.operation = "insert", owner_id = %note.owner_id))]
    async fn insert_note(&self, note: &NewNote) -> RecordResult<NoteRecord> {
        let row = sqlx::query_as::<Postgres, NoteRow>(&format!(
            r#"
            INSERT INTO notes (
                user_id, title, description, subject, semester, branch, tags,
                storage_path, file_url, file_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            NOTE_COLUMNS
        ))
        .bind(&note.owner_id)
        .bind(&note.title)
        .bind(&note.description)
        .bind(&note.subject)
        .bind(&note.semester)
        .bind(&note.branch)
        .bind(&note.tags)
        .bind(&note.storage_path)
        .bind(&note.remote_url)
        .bind(note.file_kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[tracing::instrument(skip(self), fields(db.table = "notes", db.operation = "select", db.record_id = %id))]
    async fn get_note(&self, id: Uuid) -> RecordResult<Option<NoteRecord>> {
        let row = sqlx::query_as::<Postgres, NoteRow>(&format!(
            "SELECT {} FROM notes WHERE id = $1",
            NOTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(NoteRecord::try_from).transpose()
    }

    #[tracing::instrument(skip(self, patch), fields(db.table = "notes", db.operation = "update", db.record_id = %id))]
    async fn update_note(
        &self,
        id: Uuid,
        owner_id: &str,
        patch: &NoteUpdate,
    ) -> RecordResult<NoteRecord> {
        let row = sqlx::query_as::<Postgres, NoteRow>(&format!(
            r#"
            UPDATE notes SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                subject = COALESCE($5, subject),
                semester = COALESCE($6, semester),
                branch = COALESCE($7, branch),
                tags = COALESCE($8, tags),
                storage_path = COALESCE($9, storage_path),
                file_url = COALESCE($10, file_url),
                file_type = COALESCE($11, file_type)
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            NOTE_COLUMNS
        ))
        .bind(id)
        .bind(owner_id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.subject)
        .bind(&patch.semester)
        .bind(&patch.branch)
        .bind(&patch.tags)
        .bind(&patch.storage_path)
        .bind(&patch.remote_url)
        .bind(patch.file_kind.map(|k| k.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RecordStoreError::NotFound(format!("note {}", id)))?
            .try_into()
    }

    #[tracing::instrument(skip(self), fields(db.table = "notes", db.operation = "delete", db.record_id = %id))]
    async fn delete_note(&self, id: Uuid, owner_id: &str) -> RecordResult<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, filters), fields(db.table = "notes", db.operation = "select_list"))]
    async fn list_notes(
        &self,
        filters: &NoteFilters,
        order: NoteOrder,
        limit: Option<u32>,
    ) -> RecordResult<Vec<NoteRecord>> {
        let order_by = match order {
            NoteOrder::Recent => "created_at DESC",
            NoteOrder::Trending => "likes DESC, downloads DESC",
        };
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<Postgres, NoteRow>(&format!(
            r#"
            SELECT {}
            FROM notes
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR subject = $2)
              AND ($3::text IS NULL OR branch = $3)
              AND ($4::text IS NULL OR semester = $4)
              AND (cardinality($5::text[]) = 0 OR tags && $5)
              AND ($6::text IS NULL OR title ILIKE $6 OR description ILIKE $6)
            ORDER BY {}
            LIMIT $7
            "#,
            NOTE_COLUMNS, order_by
        ))
        .bind(&filters.owner_id)
        .bind(&filters.subject)
        .bind(&filters.branch)
        .bind(&filters.semester)
        .bind(&filters.tags)
        .bind(search)
        .bind(limit.map(i64::from))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NoteRecord::try_from).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "notes", db.operation = "increment", db.record_id = %id, counter = counter.column()))]
    async fn increment_counter(&self, id: Uuid, counter: NoteCounter) -> RecordResult<u64> {
        // Single-statement increment; concurrent callers never lose an update.
        let sql = match counter {
            NoteCounter::Likes => "UPDATE notes SET likes = likes + 1 WHERE id = $1 RETURNING likes",
            NoteCounter::Downloads => {
                "UPDATE notes SET downloads = downloads + 1 WHERE id = $1 RETURNING downloads"
            }
        };

        let value = sqlx::query_scalar::<Postgres, i64>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RecordStoreError::NotFound(format!("note {}", id)))?;

        Ok(value.max(0) as u64)
    }
}

#[async_trait]
impl ProfileStore for PgRecordStore {
    #[tracing::instrument(skip(self), fields(db.table = "profiles", db.operation = "select"))]
    async fn find_profile(&self, id: &str) -> RecordResult<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, full_name, branch, year, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Profile {
            id: row.get("id"),
            full_name: row.get("full_name"),
            branch: row.get("branch"),
            year: row.get("year"),
            created_at: row.get("created_at"),
        }))
    }

    #[tracing::instrument(skip(self, profile), fields(db.table = "profiles", db.operation = "insert"))]
    async fn insert_profile(&self, profile: &Profile) -> RecordResult<()> {
        sqlx::query("INSERT INTO profiles (id, full_name, branch, year) VALUES ($1, $2, $3, $4)")
            .bind(&profile.id)
            .bind(&profile.full_name)
            .bind(&profile.branch)
            .bind(&profile.year)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, profile), fields(db.table = "profiles", db.operation = "upsert"))]
    async fn upsert_profile(&self, profile: &Profile) -> RecordResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, branch, year)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                branch = COALESCE(EXCLUDED.branch, profiles.branch),
                year = COALESCE(EXCLUDED.year, profiles.year)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.full_name)
        .bind(&profile.branch)
        .bind(&profile.year)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(file_type: &str) -> NoteRow {
        NoteRow {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            title: "Algebra".into(),
            description: None,
            subject: "Maths".into(),
            semester: None,
            branch: None,
            tags: vec![],
            storage_path: "u1/1_algebra.pdf".into(),
            file_url: "https://example.test/u1/1_algebra.pdf".into(),
            file_type: file_type.into(),
            likes: 3,
            downloads: -1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_into_record() {
        let note = NoteRecord::try_from(row("image")).unwrap();
        assert_eq!(note.file_kind, FileKind::Image);
        assert_eq!(note.like_count, 3);
        assert_eq!(note.download_count, 0);
        assert_eq!(note.owner_id, "u1");
    }

    #[test]
    fn unknown_file_type_is_a_decode_error() {
        let err = NoteRecord::try_from(row("video")).unwrap_err();
        assert!(matches!(err, RecordStoreError::Decode(_)));
    }
}
