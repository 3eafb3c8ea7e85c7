//! reqwest client for the hosted backend: GoTrue auth, PostgREST tables and
//! the storage API, all behind one project URL.

pub mod auth;
pub mod rest;
pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use inventaris_core::error::BackendError;
use inventaris_domain::id::UserId;
use inventaris_domain::user::Identity;

use crate::config::InventoryConfig;
use crate::domain::types::{AuthEvent, Session};
use crate::error::InventoryError;

pub use auth::SupabaseAuth;
pub use rest::SupabaseRest;
pub use storage::SupabaseStorage;

const EVENT_CAPACITY: usize = 16;

/// Which key authorizes a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// Anon key as `apikey`; the signed-in user's token (or the anon key) as bearer.
    User,
    /// Service-role key for both. Bypasses row-level security.
    Service,
}

struct Shared {
    http: Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
    session: RwLock<Option<Session>>,
    /// Serializes token refreshes.
    refresh: Mutex<()>,
    events: broadcast::Sender<AuthEvent>,
    session_file: Option<PathBuf>,
}

/// Shared handle onto one backend project. Cheap to clone.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<Shared>,
}

impl SupabaseClient {
    /// Build the HTTP client and restore a session saved by an earlier run.
    pub async fn connect(config: &InventoryConfig) -> Result<Self, InventoryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let session_file = config.session_path();
        let session = match &session_file {
            Some(path) => load_session(path).await,
            None => None,
        };
        if let Some(s) = &session {
            debug!(user_id = %s.user.id, "restored saved session");
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(Shared {
                http,
                base_url: config.base_url().to_owned(),
                anon_key: config.supabase_anon_key.clone(),
                service_role_key: config.supabase_service_role_key.clone(),
                session: RwLock::new(session),
                refresh: Mutex::new(()),
                events,
                session_file,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub(crate) fn anon_key(&self) -> &str {
        &self.inner.anon_key
    }

    pub fn has_service_key(&self) -> bool {
        self.inner.service_role_key.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// The cached session without refreshing it.
    pub fn cached_session(&self) -> Option<Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the cached session and mirror it to the session file.
    pub(crate) async fn store_session(&self, session: Option<Session>) {
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = session.clone();
        if let Some(path) = &self.inner.session_file {
            if let Err(e) = save_session(path, session.as_ref()).await {
                warn!(path = %path.display(), error = %e, "failed to persist session");
            }
        }
    }

    /// The current session, refreshed first when it is about to expire.
    ///
    /// A refresh the backend rejects ends the session (`SignedOut`); a
    /// refresh that never reached the backend is returned as an error.
    pub async fn current_session(&self) -> Result<Option<Session>, InventoryError> {
        match self.cached_session() {
            Some(s) if s.needs_refresh(Utc::now()) => {}
            other => return Ok(other),
        }

        let _guard = self.inner.refresh.lock().await;
        let session = match self.cached_session() {
            Some(s) if s.needs_refresh(Utc::now()) => s,
            other => return Ok(other),
        };

        match self.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                info!(user_id = %fresh.user.id, "session refreshed");
                self.store_session(Some(fresh.clone())).await;
                self.emit(AuthEvent::TokenRefreshed(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(InventoryError::Backend(e)) if e.status.is_some() => {
                warn!(user_id = %session.user.id, error = %e, "session refresh rejected");
                self.store_session(None).await;
                self.emit(AuthEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, InventoryError> {
        let url = self.url("/auth/v1/token", &[("grant_type", "refresh_token")])?;
        // The expiring access token is not sent; the anon key authorizes the grant.
        let request = self
            .request(Method::POST, url, Credential::User, Some(&self.inner.anon_key))?
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let token: TokenResponse = read_json(self.send(request).await?).await?;
        Ok(token.into_session(Utc::now()))
    }

    /// `<base><path>?<query>`.
    pub(crate) fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, InventoryError> {
        let mut url = Url::parse(&format!("{}{path}", self.inner.base_url))
            .with_context(|| format!("invalid backend URL for {path}"))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// A request carrying `apikey` and a bearer token for `credential`.
    ///
    /// `bearer` overrides the token the user credential would send.
    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        credential: Credential,
        bearer: Option<&str>,
    ) -> Result<RequestBuilder, InventoryError> {
        let (key, token) = match credential {
            Credential::User => {
                let token = match bearer {
                    Some(t) => t.to_owned(),
                    None => self
                        .cached_session()
                        .map(|s| s.access_token)
                        .unwrap_or_else(|| self.inner.anon_key.clone()),
                };
                (self.inner.anon_key.clone(), token)
            }
            Credential::Service => {
                let key = self
                    .inner
                    .service_role_key
                    .clone()
                    .context("SUPABASE_SERVICE_ROLE_KEY is required for this operation")?;
                (key.clone(), key)
            }
        };
        Ok(self
            .inner
            .http
            .request(method, url)
            .header("apikey", key)
            .header(AUTHORIZATION, format!("Bearer {token}")))
    }

    /// Like [`request`](Self::request), refreshing the user session first.
    pub(crate) async fn authorized(
        &self,
        method: Method,
        url: Url,
        credential: Credential,
    ) -> Result<RequestBuilder, InventoryError> {
        if credential == Credential::User {
            self.current_session().await?;
        }
        self.request(method, url, credential, None)
    }

    /// Send and turn non-2xx responses into [`BackendError`].
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::from_response(status.as_u16(), &body))
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| BackendError::transport(e.to_string()))?;
    serde_json::from_slice(&body)
        .map_err(|e| BackendError::transport(format!("unexpected response body: {e}")))
}

// ── Wire types ───────────────────────────────────────────────────────────────

/// GoTrue user object (subset).
#[derive(Debug, Deserialize)]
pub(crate) struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthUser {
    pub fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.unwrap_or_default(),
        }
    }
}

/// GoTrue token grant response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl TokenResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + chrono::Duration::seconds(self.expires_in.unwrap_or(3600)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into_identity(),
        }
    }
}

// ── Session file ─────────────────────────────────────────────────────────────

async fn load_session(path: &Path) -> Option<Session> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read session file");
            return None;
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable session file");
            None
        }
    }
}

async fn save_session(path: &Path, session: Option<&Session>) -> anyhow::Result<()> {
    let Some(session) = session else {
        return match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        };
    };
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let body = serde_json::to_vec_pretty(session)?;

    // Tokens inside; owner-only on unix.
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // `mode` only applies on creation; tighten files left by older runs.
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await
            .with_context(|| format!("failed to restrict {}", path.display()))?;
    }
    file.write_all(&body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush().await?;
    Ok(())
}
