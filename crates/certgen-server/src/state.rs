//! State shared by all request handlers.

use std::sync::Arc;

use axum::extract::FromRef;

use certgen_providers::canva::{DesignClient, OAuthClient};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::session::SessionStore;

/// Application state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Resolved configuration.
    pub config: Arc<ServerConfig>,
    /// Server-side sessions.
    pub sessions: Arc<SessionStore>,
    /// OAuth client for login and token exchange.
    pub oauth: OAuthClient,
    /// Design API client for template customization.
    pub design: DesignClient,
}

impl AppState {
    /// Builds the state, sharing one HTTP client between both API clients.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let canva = config.canva_config();
        let http_client = canva.http_client()?;
        let design = DesignClient::with_http_client(&canva, http_client.clone());
        let oauth = OAuthClient::with_http_client(canva, http_client);
        let sessions =
            SessionStore::new(config.session_secret.expose())?.with_ttl(config.session_ttl());

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            oauth,
            design,
        })
    }
}

impl FromRef<AppState> for Arc<SessionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
