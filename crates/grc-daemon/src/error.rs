//! Error types for grc-daemon

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use grc_agenda::AgendaError;
use grc_register::FieldError;
use grc_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Startup errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The config file exists but is not valid TOML for [`GrcConfig`](crate::GrcConfig).
    #[error("invalid config at {path}: {source}")]
    Config {
        path: String,
        source: toml::de::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Anything the engine or lifecycle service reports.
    #[error(transparent)]
    Agenda(#[from] AgendaError),

    /// Request could not be read (bad JSON, path/body mismatch, key taken).
    #[error("{0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { .. } | StoreError::InvalidKey(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Agenda(AgendaError::Store(other)),
        }
    }
}

impl From<Vec<FieldError>> for ApiError {
    fn from(errors: Vec<FieldError>) -> Self {
        ApiError::Agenda(AgendaError::Validation(errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Agenda(e) => match e {
                AgendaError::Validation(_)
                | AgendaError::PhaseMismatch { .. }
                | AgendaError::InvalidState(_)
                | AgendaError::DuplicateEntry { .. } => StatusCode::BAD_REQUEST,
                AgendaError::NotFound { .. } => StatusCode::NOT_FOUND,
                AgendaError::Conflict { .. } | AgendaError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side failures are logged in full and reported generically.
        let error = if status.is_server_error() {
            tracing::error!("request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let details = match self {
            ApiError::Agenda(AgendaError::Validation(fields)) => Some(fields),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error,
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let bad = ApiError::from(AgendaError::InvalidState("closed".into()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(AgendaError::not_found("risk", "RISK-404"));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let conflict = ApiError::from(AgendaError::Conflict {
            workshop_id: "WS-1".into(),
        });
        assert_eq!(conflict.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let taken = ApiError::from(StoreError::AlreadyExists {
            collection: "risk",
            key: "RISK-001".into(),
        });
        assert_eq!(taken.status(), StatusCode::BAD_REQUEST);

        let poisoned = ApiError::from(StoreError::LockPoisoned);
        assert_eq!(poisoned.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
