//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use identity_auth::error::{
    Error as IdentityAuthError, ErrorKind as IdentityAuthErrorKind, OAuthErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries: `web` depends on `domain` but never directly on `entity_api` or
/// `identity-auth`, and uses the `error_kind` tree to pick HTTP status codes and messages.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Config,
    Other(String),
}

/// Enum representing the various kinds of entity errors that can bubble up from the "Entity" layer.
/// These errors are translated from the `entity_api` layer to the `domain` layer and reduced to a
/// subset of error kinds that are relevant to the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    Unauthenticated,
    Forbidden,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The authorization server could not be reached or failed internally.
    Network,
    /// The authorization server refused to exchange an authorization code.
    AuthorizationRejected,
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::InvalidQueryTerm => EntityErrorKind::Invalid,
            _ => EntityErrorKind::Other("EntityErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

// Translation from the `identity-auth` layer. The authorization-rejected and
// upstream-unavailable kinds survive the translation so the web layer can
// distinguish a failed login (400) from an unreachable identity server (502).
impl From<IdentityAuthError> for Error {
    fn from(err: IdentityAuthError) -> Self {
        let error_kind = match &err.error_kind {
            IdentityAuthErrorKind::OAuth(OAuthErrorKind::AuthorizationRejected) => {
                DomainErrorKind::External(ExternalErrorKind::AuthorizationRejected)
            }
            IdentityAuthErrorKind::OAuth(OAuthErrorKind::UpstreamUnavailable) => {
                DomainErrorKind::External(ExternalErrorKind::Network)
            }
            IdentityAuthErrorKind::OAuth(_) => {
                DomainErrorKind::External(ExternalErrorKind::Other("OAuth error".to_string()))
            }
            IdentityAuthErrorKind::Http(_) => {
                DomainErrorKind::External(ExternalErrorKind::Network)
            }
            IdentityAuthErrorKind::Storage(_) => DomainErrorKind::Internal(InternalErrorKind::Other(
                "Token encryption error".to_string(),
            )),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
