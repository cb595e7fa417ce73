//! OAuth 2.0 PKCE flow for the Canva Connect API.
//!
//! The flow is split across two browser requests handled by the web server:
//!
//! 1. `/login` generates a code verifier and its SHA-256 challenge, keeps the
//!    verifier in the session and redirects to the authorization URL
//! 2. The user grants access; the platform redirects back with a code
//! 3. `/oauth/callback` exchanges the code (with the stored verifier) for an
//!    access token
//!
//! This module provides the pieces; the server owns the session.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::CanvaConfig;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 64;

/// Message used when the token endpoint gives no reason for a failure.
const UNKNOWN_ERROR: &str = "Unknown error";

/// A PKCE verifier and its derived challenge.
///
/// Implements RFC 7636 with the `S256` method.
#[derive(Debug, Clone)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string). Kept secret.
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
}

impl PkceFlow {
    /// Creates a new PKCE pair with a random verifier.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// Generates a cryptographically random code verifier.
    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Computes the SHA-256 challenge for a code verifier.
    pub fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a PKCE pair, returned as `(code_verifier, code_challenge)`.
pub fn generate_code_challenge() -> (String, String) {
    let flow = PkceFlow::new();
    (flow.verifier, flow.challenge)
}

/// Builds the authorization URL the browser is redirected to.
///
/// The client ID is not validated here; a misconfigured ID surfaces as an
/// error page on the platform's side.
pub fn build_auth_url(config: &CanvaConfig, challenge: &str) -> String {
    let mut url = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&\
        code_challenge_method=S256&code_challenge={}",
        config.auth_url,
        urlencoding::encode(&config.credentials.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(challenge),
    );
    if !config.scopes.is_empty() {
        url.push_str("&scope=");
        url.push_str(&urlencoding::encode(&config.scopes.join(" ")));
    }
    url
}

/// Tokens returned by a successful code exchange.
#[derive(Clone)]
pub struct AccessToken {
    /// Bearer credential for API calls.
    pub access_token: String,
    /// Refresh token, if the platform issued one.
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: Option<i64>,
    /// Token type, normally `Bearer`.
    pub token_type: Option<String>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Body returned by the token endpoint, successful or not.
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    /// Turns the response into a token, or an error describing why there is none.
    fn into_access_token(self) -> ProviderResult<AccessToken> {
        match self.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => Ok(AccessToken {
                access_token,
                refresh_token: self.refresh_token,
                expires_in: self.expires_in,
                token_type: self.token_type,
            }),
            None => {
                let description = self
                    .error_description
                    .or(self.error)
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                Err(ProviderError::token_exchange(description))
            }
        }
    }
}

/// OAuth client for the design platform.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: CanvaConfig,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client for the given configuration.
    pub fn new(config: CanvaConfig) -> ProviderResult<Self> {
        let http_client = config.http_client()?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// Creates a new OAuth client sharing an existing HTTP client.
    pub fn with_http_client(config: CanvaConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CanvaConfig {
        &self.config
    }

    /// Starts an authorization: returns the PKCE pair to keep and the URL to
    /// redirect the browser to.
    pub fn begin(&self) -> (PkceFlow, String) {
        let pkce = PkceFlow::new();
        let url = build_auth_url(&self.config, &pkce.challenge);
        debug!("authorization URL: {}", url);
        (pkce, url)
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// The response body is interpreted whatever the HTTP status: a token
    /// endpoint reports failures as JSON with an `error_description`.
    ///
    /// # Errors
    ///
    /// - `TokenExchangeFailed` with the provider's description (or
    ///   `"Unknown error"`) when no access token is returned
    /// - `NetworkError` if the request cannot be sent or read
    /// - `InvalidResponse` if the body is not JSON
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> ProviderResult<AccessToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.credentials.client_id.as_str()),
            ("client_secret", self.config.credentials.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
            ("code_verifier", verifier),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::transport("token exchange", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::transport("reading token response", e))?;

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
                .with_status(status.as_u16())
        })?;

        match token_response.into_access_token() {
            Ok(token) => {
                info!("obtained access token");
                Ok(token)
            }
            Err(e) => {
                warn!(status = status.as_u16(), "token exchange failed: {}", e.message());
                Err(e.with_status(status.as_u16()))
            }
        }
    }
}
