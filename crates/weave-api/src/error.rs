use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Every failure a request can end in.
///
/// Policy failures (`Unauthenticated`, `Forbidden`, `NotFound`,
/// `ValidationFailed`, `Conflict`) are returned as soon as they are detected.
/// Store failures become `OperationFailed`, or `DeletionFailed` when they
/// happen inside a deletion cascade.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Deletion failed: {0}")]
    DeletionFailed(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl ApiError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Conflict(_) => "conflict",
            Self::DeletionFailed(_) => "deletion_failed",
            Self::OperationFailed(_) => "operation_failed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DeletionFailed(_) | Self::OperationFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Re-labels a store failure that happened inside a deletion cascade.
    /// Policy errors pass through untouched.
    pub fn into_deletion_failure(self) -> Self {
        match self {
            Self::OperationFailed(msg) => Self::DeletionFailed(msg),
            other => other,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Store error: {:#}", err);
        ApiError::OperationFailed("the store did not confirm the change".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}
