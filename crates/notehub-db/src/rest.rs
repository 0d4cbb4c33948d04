//! Record store over the backend's PostgREST row API.

use crate::traits::{NoteStore, ProfileStore, RecordResult, RecordStoreError};
use async_trait::async_trait;
use notehub_core::models::{
    NewNote, NoteCounter, NoteFilters, NoteOrder, NoteRecord, NoteUpdate, Profile,
};
use notehub_core::{Config, SessionProvider};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const RETURN_REPRESENTATION: &str = "return=representation";

/// PostgREST-backed repository for notes and profiles
#[derive(Clone)]
pub struct RestRecordStore {
    client: Client,
    rest_url: String,
    api_key: String,
    notes_table: String,
    profiles_table: String,
    session: Arc<dyn SessionProvider>,
}

impl RestRecordStore {
    pub fn new(
        rest_url: impl Into<String>,
        api_key: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        timeout: Duration,
    ) -> RecordResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecordStoreError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            notes_table: notehub_core::constants::DEFAULT_NOTES_TABLE.to_string(),
            profiles_table: notehub_core::constants::DEFAULT_PROFILES_TABLE.to_string(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: Arc<dyn SessionProvider>) -> RecordResult<Self> {
        let mut store = Self::new(
            config.rest_api_url(),
            config.supabase_anon_key.clone(),
            session,
            config.network_timeout(),
        )?;
        store.notes_table = config.notes_table.clone();
        store.profiles_table = config.profiles_table.clone();
        Ok(store)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    async fn authorized(&self, request: RequestBuilder) -> RecordResult<RequestBuilder> {
        let token = self
            .session
            .access_token()
            .await
            .map_err(|e| RecordStoreError::Unauthorized(e.to_string()))?;
        Ok(request.bearer_auth(token).header("apikey", &self.api_key))
    }

    async fn execute(&self, request: RequestBuilder) -> RecordResult<Response> {
        let response = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| RecordStoreError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(RecordStoreError::from_status(status, &body))
        }
    }

    async fn rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> RecordResult<Vec<T>> {
        self.execute(request)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|e| RecordStoreError::Decode(e.to_string()))
    }

    fn filter_params(filters: &NoteFilters) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(owner) = &filters.owner_id {
            params.push(("user_id", format!("eq.{}", owner)));
        }
        if let Some(subject) = &filters.subject {
            params.push(("subject", format!("eq.{}", subject)));
        }
        if let Some(branch) = &filters.branch {
            params.push(("branch", format!("eq.{}", branch)));
        }
        if let Some(semester) = &filters.semester {
            params.push(("semester", format!("eq.{}", semester)));
        }
        if !filters.tags.is_empty() {
            let tags: Vec<String> = filters.tags.iter().map(|t| quoted(t)).collect();
            params.push(("tags", format!("ov.{{{}}}", tags.join(","))));
        }
        if let Some(search) = &filters.search {
            let pattern = quoted(&format!("*{}*", search));
            params.push((
                "or",
                format!(
                    "(title.ilike.{p},description.ilike.{p})",
                    p = pattern
                ),
            ));
        }
        params
    }
}

/// Double-quote a value inside a filter expression or array literal so
/// `,` `(` `)` `{` `}` in user input stay literal.
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[async_trait]
impl NoteStore for RestRecordStore {
    #[tracing::instrument(skip(self, note), fields(db.table = %self.notes_table, db.operation = "insert", owner_id = %note.owner_id))]
    async fn insert_note(&self, note: &NewNote) -> RecordResult<NoteRecord> {
        let request = self
            .client
            .post(self.table_url(&self.notes_table))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(note);

        self.rows::<NoteRecord>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RecordStoreError::Decode("insert returned no row".to_string()))
    }

    #[tracing::instrument(skip(self), fields(db.table = %self.notes_table, db.operation = "select", db.record_id = %id))]
    async fn get_note(&self, id: Uuid) -> RecordResult<Option<NoteRecord>> {
        let request = self
            .client
            .get(self.table_url(&self.notes_table))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);

        Ok(self.rows::<NoteRecord>(request).await?.into_iter().next())
    }

    #[tracing::instrument(skip(self, patch), fields(db.table = %self.notes_table, db.operation = "update", db.record_id = %id))]
    async fn update_note(
        &self,
        id: Uuid,
        owner_id: &str,
        patch: &NoteUpdate,
    ) -> RecordResult<NoteRecord> {
        let request = self
            .client
            .patch(self.table_url(&self.notes_table))
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", owner_id)),
            ])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(patch);

        self.rows::<NoteRecord>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RecordStoreError::NotFound(format!("note {}", id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = %self.notes_table, db.operation = "delete", db.record_id = %id))]
    async fn delete_note(&self, id: Uuid, owner_id: &str) -> RecordResult<bool> {
        let request = self
            .client
            .delete(self.table_url(&self.notes_table))
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", owner_id)),
            ])
            .header("Prefer", RETURN_REPRESENTATION);

        let deleted = self.rows::<serde_json::Value>(request).await?;
        Ok(!deleted.is_empty())
    }

    #[tracing::instrument(skip(self, filters), fields(db.table = %self.notes_table, db.operation = "select_list"))]
    async fn list_notes(
        &self,
        filters: &NoteFilters,
        order: NoteOrder,
        limit: Option<u32>,
    ) -> RecordResult<Vec<NoteRecord>> {
        let mut params = Self::filter_params(filters);
        params.push(("select", "*".to_string()));
        params.push((
            "order",
            match order {
                NoteOrder::Recent => "created_at.desc".to_string(),
                NoteOrder::Trending => "likes.desc,downloads.desc".to_string(),
            },
        ));
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        let request = self
            .client
            .get(self.table_url(&self.notes_table))
            .query(&params);
        self.rows(request).await
    }

    #[tracing::instrument(skip(self), fields(db.operation = "rpc", db.record_id = %id, counter = counter.column()))]
    async fn increment_counter(&self, id: Uuid, counter: NoteCounter) -> RecordResult<u64> {
        let request = self
            .client
            .post(format!("{}/rpc/increment_note_counter", self.rest_url))
            .json(&json!({ "note_id": id, "counter": counter.column() }));

        let value: Option<u64> = self
            .execute(request)
            .await?
            .json()
            .await
            .map_err(|e| RecordStoreError::Decode(e.to_string()))?;

        value.ok_or_else(|| RecordStoreError::NotFound(format!("note {}", id)))
    }
}

#[async_trait]
impl ProfileStore for RestRecordStore {
    #[tracing::instrument(skip(self), fields(db.table = %self.profiles_table, db.operation = "select"))]
    async fn find_profile(&self, id: &str) -> RecordResult<Option<Profile>> {
        let request = self
            .client
            .get(self.table_url(&self.profiles_table))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);

        Ok(self.rows::<Profile>(request).await?.into_iter().next())
    }

    #[tracing::instrument(skip(self, profile), fields(db.table = %self.profiles_table, db.operation = "insert"))]
    async fn insert_profile(&self, profile: &Profile) -> RecordResult<()> {
        let request = self
            .client
            .post(self.table_url(&self.profiles_table))
            .json(&json!({ "id": profile.id }));
        self.execute(request).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, profile), fields(db.table = %self.profiles_table, db.operation = "upsert"))]
    async fn upsert_profile(&self, profile: &Profile) -> RecordResult<()> {
        let request = self
            .client
            .post(self.table_url(&self.profiles_table))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&json!({ "id": profile.id }));
        self.execute(request).await?;
        Ok(())
    }
}
