//! Canva Connect configuration.

use std::fmt;
use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials for the Canva Connect API.
#[derive(Clone)]
pub struct OAuthCredentials {
    /// The OAuth client ID from the Canva developer portal.
    pub client_id: String,
    /// The OAuth client secret from the Canva developer portal.
    pub client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Endpoints and transport settings for the design platform.
#[derive(Debug, Clone)]
pub struct CanvaConfig {
    /// OAuth credentials.
    pub credentials: OAuthCredentials,

    /// Redirect URI registered for this application.
    pub redirect_uri: String,

    /// Authorization endpoint the browser is sent to.
    pub auth_url: String,

    /// Token endpoint used for the code exchange.
    pub token_url: String,

    /// Base URL of the REST API.
    pub api_base: String,

    /// OAuth scopes to request. Omitted from the authorization URL when empty.
    pub scopes: Vec<String>,

    /// Request timeout. `None` leaves outbound requests unbounded.
    pub timeout: Option<Duration>,

    /// User agent string for API requests.
    pub user_agent: String,
}

impl CanvaConfig {
    /// Default authorization endpoint.
    pub const DEFAULT_AUTH_URL: &'static str = "https://www.canva.com/api/oauth/authorize";

    /// Default token endpoint.
    pub const DEFAULT_TOKEN_URL: &'static str = "https://www.canva.com/api/oauth/token";

    /// Default REST API base.
    pub const DEFAULT_API_BASE: &'static str = "https://api.canva.com/v1";

    /// Default redirect URI, bound to the local loopback address.
    pub const DEFAULT_REDIRECT_URI: &'static str = "http://127.0.0.1:5000/oauth/callback";

    /// Creates a configuration with the default endpoints.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            redirect_uri: Self::DEFAULT_REDIRECT_URI.to_string(),
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            scopes: Vec::new(),
            timeout: None,
            user_agent: format!("certgen/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the redirect URI.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Sets the authorization endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Sets the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the REST API base URL. A trailing slash is ignored.
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the template customization endpoint.
    pub fn customize_url(&self) -> String {
        format!("{}/templates/customize", self.api_base)
    }

    /// Builds the HTTP client shared by the OAuth and API clients.
    pub fn http_client(&self) -> ProviderResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|e| {
            ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                .with_source(e)
        })
    }
}
