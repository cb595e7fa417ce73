//! Server-side sessions.
//!
//! Session data lives in memory, keyed by a random id. The browser only holds
//! the id, signed with the session secret so a forged or altered cookie is
//! treated as no cookie at all. Everything is lost when the server restarts,
//! which sends users back through `/login`.
//!
//! A session idle for longer than the store's TTL is gone: loading it starts
//! a fresh one, and every save drops expired entries from the map.
//!
//! Handlers receive a [`Session`] as an extractor: a request-scoped copy of
//! the stored data. Changes are written back with [`SessionStore::save`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::request::Parts;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{ServerError, ServerResult};

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "certgen_session";

/// Idle time after which a session expires, unless configured otherwise.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Values kept for one browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    /// PKCE verifier stored by `/login`, read by `/oauth/callback`.
    pub code_verifier: Option<String>,
    /// Bearer token obtained by `/oauth/callback`.
    pub access_token: Option<String>,
}

/// The session attached to the current request.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    data: SessionData,
    is_new: bool,
}

impl Session {
    fn fresh() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data: SessionData::default(),
            is_new: true,
        }
    }

    /// Returns the session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true if the browser has no cookie for this session yet.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Returns the session data.
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// Returns the stored PKCE verifier.
    pub fn code_verifier(&self) -> Option<&str> {
        self.data.code_verifier.as_deref()
    }

    /// Replaces the stored PKCE verifier.
    pub fn set_code_verifier(&mut self, verifier: impl Into<String>) {
        self.data.code_verifier = Some(verifier.into());
    }

    /// Returns the stored access token.
    pub fn access_token(&self) -> Option<&str> {
        self.data.access_token.as_deref()
    }

    /// Replaces or clears the stored access token.
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.data.access_token = token;
    }
}

/// A stored session and when it was last used.
#[derive(Debug, Clone)]
struct Entry {
    data: SessionData,
    last_seen: Instant,
}

impl Entry {
    fn new(data: SessionData) -> Self {
        Self {
            data,
            last_seen: Instant::now(),
        }
    }
}

/// In-memory session storage.
pub struct SessionStore {
    mac: HmacSha256,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates an empty store signing cookies with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> ServerResult<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| ServerError::config(format!("invalid session secret: {}", e)))?;
        Ok(Self {
            mac,
            ttl: DEFAULT_SESSION_TTL,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Sets how long a session may stay idle before it expires.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.last_seen.elapsed() >= self.ttl
    }

    fn sign(&self, id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Returns the session id in a signed cookie value, if the signature holds.
    fn verify<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (id, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(id)
    }

    /// Builds the `Set-Cookie` value for a session id.
    fn cookie(&self, id: &str) -> String {
        format!(
            "{}={}.{}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            id,
            self.sign(id)
        )
    }

    /// Resolves the session for a request, starting a fresh one when the
    /// cookie is absent, forged or refers to an unknown or expired session.
    /// A live session's idle timer restarts.
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        let Some(value) = cookie_value(headers, SESSION_COOKIE) else {
            return Session::fresh();
        };
        let Some(id) = self.verify(value) else {
            debug!("rejected session cookie with bad signature");
            return Session::fresh();
        };
        let mut sessions = self.sessions.write().await;
        let Some(entry) = sessions.get_mut(id) else {
            debug!("unknown session, starting a new one");
            return Session::fresh();
        };
        if self.is_expired(entry) {
            debug!("session expired, starting a new one");
            sessions.remove(id);
            return Session::fresh();
        }

        entry.last_seen = Instant::now();
        Session {
            id: id.to_string(),
            data: entry.data.clone(),
            is_new: false,
        }
    }

    /// Stores the session's data and drops expired sessions. Returns the
    /// `Set-Cookie` header to send when the browser does not know the
    /// session yet.
    pub async fn save(&self, session: &mut Session) -> Option<HeaderValue> {
        {
            let mut sessions = self.sessions.write().await;
            let before = sessions.len();
            sessions.retain(|_, entry| !self.is_expired(entry));
            let expired = before - sessions.len();
            if expired > 0 {
                debug!(expired, "dropped expired sessions");
            }
            sessions.insert(session.id.clone(), Entry::new(session.data.clone()));
        }

        if !session.is_new {
            return None;
        }
        session.is_new = false;
        HeaderValue::from_str(&self.cookie(&session.id)).ok()
    }

    /// Returns a copy of the stored data for a live session id.
    pub async fn get(&self, id: &str) -> Option<SessionData> {
        self.sessions
            .read()
            .await
            .get(id)
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.data.clone())
    }

    /// Returns the number of stored sessions, expired ones not yet dropped
    /// included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Finds a cookie by name across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    Arc<SessionStore>: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = Arc::<SessionStore>::from_ref(state);
        Ok(store.load(&parts.headers).await)
    }
}
