//! Canva Connect integration.
//!
//! # Authentication Flow
//!
//! 1. The server generates a PKCE verifier/challenge pair and keeps the
//!    verifier in the user's session
//! 2. The browser is redirected to the authorization page with the challenge
//! 3. The user grants access; the platform redirects back with a code
//! 4. The code and verifier are exchanged for an access token
//!
//! # Example
//!
//! ```ignore
//! use certgen_providers::canva::{CanvaConfig, DesignClient, OAuthClient, OAuthCredentials};
//!
//! let config = CanvaConfig::new(OAuthCredentials::new("client-id", "client-secret"));
//! let oauth = OAuthClient::new(config.clone())?;
//!
//! let (pkce, url) = oauth.begin();
//! // ... redirect to `url`, receive `code` ...
//! let token = oauth.exchange_code(&code, &pkce.verifier).await?;
//!
//! let design = DesignClient::new(&config)?;
//! let outcomes = design
//!     .generate_templates(&participants, template_url, &token.access_token)
//!     .await;
//! ```

mod client;
mod config;
mod oauth;

pub use client::{CustomizationOutcome, DesignClient, summarize};
pub use config::{CanvaConfig, OAuthCredentials};
pub use oauth::{AccessToken, OAuthClient, PkceFlow, build_auth_url, generate_code_challenge};
