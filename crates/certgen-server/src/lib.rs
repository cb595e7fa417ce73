//! Web front end for certgen.
//!
//! This crate serves the browser-facing workflow:
//! - OAuth 2.0 PKCE login against Canva
//! - Spreadsheet upload that requests one customized template per participant
//! - Renaming of manually exported certificate images
//!
//! # Example
//!
//! ```rust,no_run
//! use certgen_server::{AppState, ServerConfig, router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     config.ensure_dirs()?;
//!     let listener = tokio::net::TcpListener::bind(config.bind).await?;
//!     axum::serve(listener, router(AppState::new(config)?)).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
mod config;
mod error;
mod routes;
mod session;
mod signals;
mod state;

pub use cli::Cli;
pub use config::{
    CanvaSettings, ConfigOverrides, DEFAULT_CLIENT_ID, DEFAULT_CLIENT_SECRET,
    DEFAULT_SESSION_SECRET, PARTICIPANTS_FILE, Secret, ServerConfig,
};
pub use error::{AppError, ServerError, ServerResult};
pub use routes::router;
pub use session::{DEFAULT_SESSION_TTL, SESSION_COOKIE, Session, SessionData, SessionStore};
pub use signals::shutdown_signal;
pub use state::AppState;
