//! Session providers.
//!
//! `SupabaseSession` keeps the tokens of a signed-in user and refreshes the
//! access token against the auth API when it is about to expire.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use notehub_core::constants::TOKEN_REFRESH_MARGIN_SECS;
use notehub_core::models::UserIdentity;
use notehub_core::{Config, NoteError, NoteResult, SessionProvider};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;

/// Fixed identity, mostly for tests and scripted tools.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user: Option<UserIdentity>,
    token: Option<String>,
}

impl StaticSession {
    pub fn signed_in(user: UserIdentity, token: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_user(&self) -> NoteResult<UserIdentity> {
        self.user
            .clone()
            .ok_or_else(|| NoteError::Unauthenticated("no signed-in user".to_string()))
    }

    async fn access_token(&self) -> NoteResult<String> {
        self.token
            .clone()
            .ok_or_else(|| NoteError::Unauthenticated("no access token".to_string()))
    }
}

#[derive(Debug, Clone)]
struct SessionState {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    user: UserIdentity,
}

impl SessionState {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Session backed by the Supabase auth (GoTrue) token endpoint.
pub struct SupabaseSession {
    client: Client,
    auth_url: String,
    api_key: String,
    state: Mutex<Option<SessionState>>,
}

impl SupabaseSession {
    pub fn new(
        auth_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> NoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NoteError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            state: Mutex::new(None),
        })
    }

    pub fn from_config(config: &Config) -> NoteResult<Self> {
        Self::new(
            config.auth_api_url(),
            config.supabase_anon_key.clone(),
            config.network_timeout(),
        )
    }

    /// Sign in with email and password.
    #[tracing::instrument(skip(self, password), fields(auth.grant = "password"))]
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> NoteResult<UserIdentity> {
        let state = self
            .request_token("password", json!({ "email": email, "password": password }))
            .await?;
        let user = state.user.clone();
        *self.state.lock().await = Some(state);

        tracing::info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Resume a session persisted elsewhere. An already-expired access token
    /// is refreshed on first use.
    pub async fn restore(
        &self,
        user: UserIdentity,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) {
        *self.state.lock().await = Some(SessionState {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            user,
        });
    }

    pub async fn sign_out(&self) {
        *self.state.lock().await = None;
    }

    /// Current state, refreshed first if the access token is close to expiry.
    ///
    /// The lock is held across the refresh so concurrent callers wait for a
    /// single refresh instead of each spending the refresh token.
    async fn fresh_state(&self) -> NoteResult<SessionState> {
        let mut guard = self.state.lock().await;
        let state = guard
            .clone()
            .ok_or_else(|| NoteError::Unauthenticated("no active session".to_string()))?;

        let now = Utc::now();
        if !state.needs_refresh(now) {
            return Ok(state);
        }

        let refresh_token = state.refresh_token.clone();
        match self
            .request_token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(refreshed) => {
                tracing::debug!(
                    user_id = %refreshed.user.id,
                    expires_at = %refreshed.expires_at,
                    "Access token refreshed"
                );
                *guard = Some(refreshed.clone());
                Ok(refreshed)
            }
            Err(NoteError::Unauthenticated(msg)) => {
                tracing::warn!(error = %msg, "Refresh token rejected, signing out");
                *guard = None;
                Err(NoteError::Unauthenticated(msg))
            }
            Err(e) if state.expires_at > now => {
                tracing::warn!(error = %e, "Token refresh failed, using current token");
                Ok(state.clone())
            }
            Err(e) => Err(e),
        }
    }

    async fn request_token(&self, grant_type: &str, body: serde_json::Value) -> NoteResult<SessionState> {
        let response = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 | 401 | 403 | 422 => NoteError::Unauthenticated(body),
                _ => NoteError::Transport(format!("auth API returned HTTP {}: {}", status.as_u16(), body)),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| NoteError::Transport(format!("invalid token response: {}", e)))?;

        Ok(SessionState {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in),
            user: UserIdentity {
                id: token.user.id,
                email: token.user.email,
            },
        })
    }
}

#[async_trait]
impl SessionProvider for SupabaseSession {
    async fn current_user(&self) -> NoteResult<UserIdentity> {
        Ok(self.fresh_state().await?.user)
    }

    async fn access_token(&self) -> NoteResult<String> {
        Ok(self.fresh_state().await?.access_token)
    }
}
