//! Design platform integration for certgen.
//!
//! - [`canva`] - OAuth 2.0 PKCE flow and the template customization client
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//!   browser ──/login──▶ build_auth_url ──302──▶ authorization page
//!   browser ◀─/oauth/callback?code── platform
//!                 │
//!                 ▼ OAuthClient::exchange_code
//!           ┌─────────────┐
//!           │ AccessToken │
//!           └──────┬──────┘
//!                  ▼ DesignClient::generate_templates
//!        one POST /templates/customize per Participant
//! ```

pub mod canva;
pub mod error;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
