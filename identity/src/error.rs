//! Error types for the `identity` crate.
//!
//! Follows the same pattern as the other crates with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the identity crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors raised by an identity service.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The identity provider rejected the request, optionally with a machine-readable code.
    Provider { code: Option<String> },
    /// The user closed the interactive consent surface.
    Cancelled,
    Http(HttpErrorKind),
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

const CANCELLED_CODE: &str = "web-context-cancelled";
const NETWORK_CODE: &str = "network-request-failed";

impl Error {
    /// Machine-readable code for this error, when one exists.
    pub fn code(&self) -> Option<&str> {
        match &self.error_kind {
            ErrorKind::Provider { code } => code.as_deref(),
            ErrorKind::Cancelled => Some(CANCELLED_CODE),
            ErrorKind::Http(HttpErrorKind::BuilderFailed) => None,
            ErrorKind::Http(_) => Some(NETWORK_CODE),
        }
    }

    /// Free-text message carried by the source, when one exists.
    pub fn message(&self) -> Option<String> {
        self.source.as_ref().map(|source| source.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = self.message().unwrap_or_default();
        match &self.error_kind {
            ErrorKind::Provider { code: Some(code) } => {
                write!(f, "Identity provider error [{}]: {}", code, message)
            }
            ErrorKind::Provider { code: None } => write!(f, "Identity provider error: {}", message),
            ErrorKind::Cancelled => write!(f, "Sign-in cancelled: {}", message),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}: {}", kind, message),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Provider {
                code: Some("invalid-url".to_string()),
            },
        }
    }
}

/// Helper function to create provider errors.
pub fn provider_error(code: Option<&str>, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Provider {
            code: code.map(str::to_string),
        },
    }
}

/// Helper function to create the error raised when the consent surface is closed.
pub fn cancelled_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Cancelled,
    }
}

/// Helper function to create network errors that have no underlying `reqwest` error.
pub fn network_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Http(HttpErrorKind::Network),
    }
}
