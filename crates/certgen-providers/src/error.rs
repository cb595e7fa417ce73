//! Error types for design platform calls.
//!
//! Every failure carries a [`ProviderErrorCode`], a message meant for the
//! operator and, when the platform answered, the HTTP status it answered with.

use std::fmt;

use thiserror::Error;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The token endpoint returned no access token.
    TokenExchangeFailed,
    /// The request could not be sent or its response could not be read.
    NetworkError,
    /// The response body was not in the expected format.
    InvalidResponse,
    /// The client could not be set up from its configuration.
    ConfigurationError,
    /// The design API answered a customization request with a non-200 status.
    CustomizationFailed,
}

impl ProviderErrorCode {
    /// Returns the snake-case name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::NetworkError => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::CustomizationFailed => "customization_failed",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to the design platform.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates an error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Token exchange failure carrying the platform's description.
    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::TokenExchangeFailed, message)
    }

    /// Network error with a ready-made message. Failed requests go through
    /// [`Self::transport`].
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// The platform answered with a body that could not be parsed.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// The client could not be built from its settings.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Customization failure carrying the response body.
    pub fn customization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::CustomizationFailed, message)
    }

    /// Network error for a failed request, naming what was being done.
    ///
    /// Timeouts and refused connections get their own wording so the log
    /// line says which one happened.
    pub fn transport(context: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("{}: request timed out", context)
        } else if err.is_connect() {
            format!("{}: connection failed: {}", context, err)
        } else {
            format!("{}: {}", context, err)
        };
        Self::network(message).with_source(err)
    }

    /// Records the HTTP status that produced this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the underlying error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the message without the code prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the platform answered.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        Ok(())
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
