//! Error types for the homework relay.
//!
//! This module defines the error hierarchy for every relay operation:
//! startup configuration, fetching and validating the review API answer,
//! translating a homework status, and delivering chat messages.

use std::path::PathBuf;

/// A specialized `Result` type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can occur while running the relay.
///
/// Startup variants carry an actionable suggestion. Cycle variants are
/// formatted into the failure message that gets forwarded to the chat.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    // ========================================================================
    // Startup Errors
    // ========================================================================
    /// A required credential is absent from the environment.
    #[error("Missing required environment variable '{name}'\n\nSuggestion: Export {name} or add it to the .env file")]
    MissingToken {
        /// Name of the missing variable.
        name: String,
    },

    /// Invalid JSON syntax in the settings file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your homework-relay.json with a JSON linter")]
    ConfigParseError {
        /// Path to the settings file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Settings validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Review API Errors
    // ========================================================================
    /// The request never produced a response (connect failure, timeout, broken body).
    #[error("Network error while calling {endpoint}: {message}")]
    Network {
        /// The URL that was being called.
        endpoint: String,
        /// Description of the transport failure.
        message: String,
    },

    /// The endpoint answered with a status other than 200.
    #[error("Endpoint {endpoint} returned HTTP {status}")]
    HttpStatus {
        /// The URL that was called.
        endpoint: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The response body is not valid JSON.
    #[error("Failed to parse API response: {message}")]
    Parse {
        /// Description of the decoding failure.
        message: String,
    },

    /// The decoded payload does not have the expected structure.
    #[error("Unexpected API response shape: {message}")]
    Shape {
        /// What was missing or mistyped.
        message: String,
    },

    /// A homework carries a status outside the known verdicts.
    #[error("Unknown homework status: {status}")]
    UnknownStatus {
        /// The raw status value as received.
        status: String,
    },

    // ========================================================================
    // Chat Delivery Errors
    // ========================================================================
    /// The chat message could not be delivered.
    #[error("Failed to deliver chat message: {message}")]
    Delivery {
        /// Description of the delivery failure.
        message: String,
    },
}

impl RelayError {
    /// Creates a new `MissingToken` error.
    #[must_use]
    pub fn missing_token(name: impl Into<String>) -> Self {
        Self::MissingToken { name: name.into() }
    }

    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `Network` error.
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a new `HttpStatus` error.
    #[must_use]
    pub fn http_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates a new `Parse` error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a new `Shape` error.
    #[must_use]
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownStatus` error.
    #[must_use]
    pub fn unknown_status(status: impl Into<String>) -> Self {
        Self::UnknownStatus {
            status: status.into(),
        }
    }

    /// Creates a new `Delivery` error.
    #[must_use]
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }

    /// Returns `true` if this error came from the chat channel itself.
    ///
    /// Such errors are never forwarded to the chat.
    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery { .. })
    }
}
