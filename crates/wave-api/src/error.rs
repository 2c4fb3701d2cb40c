use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use wave_db::DbError;
use wave_types::validate::ValidationError;

use crate::identity::IdentityError;

/// Every handler failure maps to one of these before it reaches the client.
/// Bodies are `{"detail": "..."}`; server-side kinds never echo internals.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid authentication credentials")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Upstream {
        message: String,
        source: IdentityError,
    },

    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }

    pub fn upstream(message: &str, source: IdentityError) -> Self {
        Self::Upstream {
            message: message.to_string(),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // Duplicates are reported as plain bad requests
            Self::Validation(_) | Self::BadRequest(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => error!("Internal error: {:#}", e),
            Self::Upstream { message, source } => error!("{}: {}", message, source),
            Self::Unauthorized | Self::Forbidden(_) => warn!("Rejected request: {}", self),
            _ => debug!("Client error: {}", self),
        }

        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Store errors: constraint failures become client errors, anything else is
/// internal.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DbError>() {
            Some(DbError::Conflict(_)) => Self::Conflict("Resource already exists".into()),
            Some(DbError::MissingReference(_)) => {
                Self::BadRequest("Referenced resource does not exist".into())
            }
            Some(DbError::Check(_)) => Self::Validation("Value violates a stored constraint".into()),
            None => Self::Internal(err),
        }
    }
}
