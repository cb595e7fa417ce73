//! Server configuration.
//!
//! Settings come from built-in defaults, an optional TOML file and finally
//! command-line flags or their environment variables, each layer overriding
//! the previous one. Credentials left unset fall back to placeholder values
//! so the server still starts; [`ServerConfig::insecure_defaults`] reports
//! which ones are in use.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use certgen_providers::canva::{CanvaConfig, OAuthCredentials};

use crate::error::{ServerError, ServerResult};
use crate::session::DEFAULT_SESSION_TTL;

/// Placeholder OAuth client ID used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "default_client_id";

/// Placeholder OAuth client secret used when none is configured.
pub const DEFAULT_CLIENT_SECRET: &str = "default_client_secret";

/// Placeholder session signing key used when none is configured.
pub const DEFAULT_SESSION_SECRET: &str = "default_secret_key";

/// File name every upload is stored under.
pub const PARTICIPANTS_FILE: &str = "participants.xlsx";

/// A string that is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,

    /// Directory holding the uploaded participant spreadsheet.
    pub upload_dir: PathBuf,

    /// Directory holding the exported certificate images.
    pub certificates_dir: PathBuf,

    /// Key used to sign session cookies.
    pub session_secret: Secret,

    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,

    /// Seconds a session may stay idle before it is dropped.
    pub session_ttl_secs: u64,

    /// Design platform settings.
    pub canva: CanvaSettings,
}

/// Design platform settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanvaSettings {
    /// OAuth client ID.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: Secret,

    /// Redirect URI registered with the platform.
    pub redirect_uri: String,

    /// Authorization endpoint.
    pub auth_url: String,

    /// Token endpoint.
    pub token_url: String,

    /// REST API base URL.
    pub api_base: String,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Outbound request timeout in seconds. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            upload_dir: PathBuf::from("uploads"),
            certificates_dir: PathBuf::from("certificates"),
            session_secret: Secret::new(DEFAULT_SESSION_SECRET),
            max_upload_bytes: 16 * 1024 * 1024,
            session_ttl_secs: DEFAULT_SESSION_TTL.as_secs(),
            canva: CanvaSettings::default(),
        }
    }
}

impl Default for CanvaSettings {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: Secret::new(DEFAULT_CLIENT_SECRET),
            redirect_uri: CanvaConfig::DEFAULT_REDIRECT_URI.to_string(),
            auth_url: CanvaConfig::DEFAULT_AUTH_URL.to_string(),
            token_url: CanvaConfig::DEFAULT_TOKEN_URL.to_string(),
            api_base: CanvaConfig::DEFAULT_API_BASE.to_string(),
            scopes: Vec::new(),
            timeout_secs: None,
        }
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<SocketAddr>,
    pub upload_dir: Option<PathBuf>,
    pub certificates_dir: Option<PathBuf>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub session_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Loads configuration from `path`, or returns the defaults when no path
    /// is given.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| ServerError::config(format!("{}: {}", path.display(), e)))
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Applies command-line and environment overrides.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(dir) = overrides.upload_dir {
            self.upload_dir = dir;
        }
        if let Some(dir) = overrides.certificates_dir {
            self.certificates_dir = dir;
        }
        if let Some(id) = overrides.client_id {
            self.canva.client_id = id;
        }
        if let Some(secret) = overrides.client_secret {
            self.canva.client_secret = Secret::new(secret);
        }
        if let Some(secret) = overrides.session_secret {
            self.session_secret = Secret::new(secret);
        }
        if let Some(uri) = overrides.redirect_uri {
            self.canva.redirect_uri = uri;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.canva.timeout_secs = Some(secs);
        }
        self
    }

    /// Names the settings that still hold their placeholder value.
    pub fn insecure_defaults(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.canva.client_id == DEFAULT_CLIENT_ID {
            names.push("client_id");
        }
        if self.canva.client_secret.expose() == DEFAULT_CLIENT_SECRET {
            names.push("client_secret");
        }
        if self.session_secret.expose() == DEFAULT_SESSION_SECRET {
            names.push("session_secret");
        }
        names
    }

    /// Path of the uploaded participant spreadsheet.
    pub fn participants_path(&self) -> PathBuf {
        self.upload_dir.join(PARTICIPANTS_FILE)
    }

    /// Creates the upload and certificate directories if needed.
    pub fn ensure_dirs(&self) -> ServerResult<()> {
        for dir in [&self.upload_dir, &self.certificates_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                ServerError::config(format!("failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    /// Idle time after which a session expires.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Builds the provider configuration.
    pub fn canva_config(&self) -> CanvaConfig {
        let settings = &self.canva;
        CanvaConfig::new(OAuthCredentials::new(
            settings.client_id.clone(),
            settings.client_secret.expose(),
        ))
        .with_redirect_uri(settings.redirect_uri.clone())
        .with_auth_url(settings.auth_url.clone())
        .with_token_url(settings.token_url.clone())
        .with_api_base(settings.api_base.clone())
        .with_scopes(settings.scopes.clone())
        .with_timeout(settings.timeout_secs.map(Duration::from_secs))
    }
}
