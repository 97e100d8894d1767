//! Error types for the `identity-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for identity-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in identity-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    OAuth(OAuthErrorKind),
    Storage(StorageErrorKind),
    Http(HttpErrorKind),
}

/// Errors from exchanges with the authorization server.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    /// The authorization server refused to exchange an authorization code
    /// (bad/expired/reused code, verifier mismatch, redirect mismatch).
    AuthorizationRejected,
    /// The authorization server refused a refresh token (expired, revoked,
    /// wrong client).
    RefreshRejected,
    /// The authorization server could not be reached, timed out, or failed
    /// with a server error.
    UpstreamUnavailable,
    /// The server answered 2xx but the body was not a usable token payload.
    InvalidResponse,
}

/// Errors from at-rest token encryption.
#[derive(Debug, PartialEq)]
pub enum StorageErrorKind {
    EncryptionFailed,
    DecryptionFailed,
}

/// Errors from HTTP client construction and transport.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Storage(kind) => write!(f, "Storage error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
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

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create storage errors.
pub fn storage_error(kind: StorageErrorKind) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Storage(kind),
    }
}
