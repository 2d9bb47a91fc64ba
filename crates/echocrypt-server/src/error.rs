//! HTTP error mapping.
//!
//! One taxonomy at the surface: validation, authentication, authorization,
//! and not-found failures are fatal to the specific request and surface as
//! the matching status code; none of them ever crash the store.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::directory::AuthError;
use crate::store::StoreError;

/// Request-level errors surfaced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request body or parameters.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid bearer token.
    #[error("authentication required")]
    Unauthorized,

    /// The referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Caller is authenticated but not allowed to touch the resource.
    #[error("{0}")]
    Forbidden(String),

    /// Server-side failure unrelated to the request.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(_) => Self::NotFound("room not found".to_string()),
            StoreError::NotAMember { .. } => {
                Self::Forbidden("not a member of this room".to_string())
            },
            StoreError::CiphertextTooShort { .. } => Self::Validation(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UsernameTaken => Self::Validation(err.to_string()),
            AuthError::InvalidCredentials => Self::Unauthorized,
            AuthError::Hashing(reason) => {
                tracing::error!("password hashing failure: {}", reason);
                Self::Internal
            },
        }
    }
}
