use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use locker_db::repo::sharing::SharingTxError;
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

use crate::infra::metrics;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    #[error("forbidden_no_body")]
    ForbiddenNoBody,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("bad_request: {0}")]
    BadRequest(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("not_found")]
    NotFound,
    #[error("db_error")]
    DbError,
    #[error("internal: {0}")]
    Internal(&'static str),
}

#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

impl From<SharingTxError> for ServiceError {
    fn from(err: SharingTxError) -> Self {
        match err {
            SharingTxError::Db(err) => {
                tracing::error!(event = "sharing_tx_failed", error = %err, "DB error");
                Self::DbError
            }
            SharingTxError::Rejected("insufficient_role") => Self::Forbidden("insufficient_role"),
            SharingTxError::Rejected(code) => Self::BadRequest(code),
            SharingTxError::Conflict(code) => Self::Conflict(code),
            SharingTxError::Forbidden => forbidden("invite_group", "groups"),
            SharingTxError::NotFound => Self::NotFound,
        }
    }
}

impl From<locker_core::sharing::SharingViolation> for ServiceError {
    fn from(violation: locker_core::sharing::SharingViolation) -> Self {
        SharingTxError::from(violation).into()
    }
}

pub(crate) fn forbidden(action: &'static str, resource: &str) -> ServiceError {
    metrics::forbidden_access(resource);
    tracing::warn!(
        event = "forbidden",
        action,
        resource = %resource,
        "Access denied"
    );
    ServiceError::ForbiddenNoBody
}

pub(crate) fn db_error(event: &'static str, err: &sqlx_core::Error) -> ServiceError {
    tracing::error!(event, error = %err, "DB error");
    ServiceError::DbError
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::ForbiddenNoBody => StatusCode::FORBIDDEN.into_response(),
            Self::Forbidden(code) => {
                (StatusCode::FORBIDDEN, Json(ErrorResponse { error: code })).into_response()
            }
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::BadRequest(code) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: code })).into_response()
            }
            Self::Conflict(code) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { error: code })).into_response()
            }
            Self::DbError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: "db_error" }),
            )
                .into_response(),
            Self::Internal(code) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: code }),
            )
                .into_response(),
        }
    }
}
