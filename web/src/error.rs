use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
};

extern crate log;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

/// The error envelope every failure shares with the original API contract:
/// `{ "success": false, "message": "<reason>" }`.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => {
                        error_response(StatusCode::NOT_FOUND, "Not found")
                    }
                    EntityErrorKind::Unauthenticated => {
                        error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
                    }
                    EntityErrorKind::Forbidden => {
                        error_response(StatusCode::FORBIDDEN, "Forbidden")
                    }
                    EntityErrorKind::Invalid => {
                        error_response(StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable entity")
                    }
                    EntityErrorKind::Other(_) => {
                        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    }
                },
                InternalErrorKind::Config => {
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
                InternalErrorKind::Other(_) => {
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::AuthorizationRejected => {
                    error_response(StatusCode::BAD_REQUEST, "Login failed")
                }
                ExternalErrorKind::Network => error_response(
                    StatusCode::BAD_GATEWAY,
                    "Authorization server unavailable",
                ),
                ExternalErrorKind::Other(_) => {
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
            },
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
