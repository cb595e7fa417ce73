//! Server error types.
//!
//! [`ServerError`] covers startup failures. [`AppError`] covers failures
//! while handling a request; every variant renders as a plain-text body.

use std::io;
use std::path::PathBuf;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use certgen_core::{ParseError, RenameError};
use certgen_providers::ProviderError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener, directories, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A provider client could not be built.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// The callback carried no authorization code.
    #[error("Authorization failed. Please try again.")]
    MissingAuthorizationCode,

    /// The session holds no code verifier (expired, or `/login` was skipped).
    #[error("Code verifier not found. Restart the login process.")]
    MissingCodeVerifier,

    /// The token endpoint returned no access token.
    #[error("Failed to obtain access token: {}", .0.message())]
    TokenExchange(ProviderError),

    /// The upload form has no `file` part.
    #[error("No file part")]
    NoFilePart,

    /// The `file` part has an empty file name.
    #[error("No selected file")]
    NoSelectedFile,

    /// The upload form has no `template_url` field.
    #[error("No template URL")]
    MissingTemplateUrl,

    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    /// The uploaded spreadsheet could not be stored.
    #[error("Failed to save upload to {}: {source}", path.display())]
    SaveUpload {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The participant spreadsheet is unreadable or incomplete.
    #[error("Invalid participant spreadsheet: {0}")]
    Participants(#[from] ParseError),

    /// The rename form was posted without confirming the downloads.
    #[error("Please confirm downloads before renaming.")]
    DownloadsNotConfirmed,

    /// Renaming certificates failed.
    #[error("Failed to rename certificates: {0}")]
    Rename(#[from] RenameError),

    /// A blocking task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuthorizationCode
            | Self::MissingCodeVerifier
            | Self::NoFilePart
            | Self::NoSelectedFile
            | Self::MissingTemplateUrl
            | Self::Multipart(_)
            | Self::Participants(_)
            | Self::DownloadsNotConfirmed
            | Self::Rename(RenameError::Participants(_)) => StatusCode::BAD_REQUEST,
            Self::TokenExchange(_) => StatusCode::BAD_GATEWAY,
            Self::SaveUpload { .. } | Self::Rename(RenameError::Io { .. }) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), "{}", body);
        } else {
            warn!(status = status.as_u16(), "{}", body);
        }
        (status, body).into_response()
    }
}
