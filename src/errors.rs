use http::StatusCode;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::OrderStatus;
use crate::services::coupons::CouponRejection;

/// Serializable error body handed to the HTTP layer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Stable machine-readable kind
    pub kind: ErrorKind,
    /// Human-readable error description
    pub message: String,
    /// Every violated coupon rule, when the caller asked for all of them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

/// Stable error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    UpstreamFailure,
    Internal,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// `reasons` is never empty; the first entry is the first failing rule.
    #[error("Coupon {code} rejected: {}", join_reasons(.reasons))]
    CouponRejected {
        code: String,
        reasons: Vec<CouponRejection>,
    },

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

fn join_reasons(reasons: &[CouponRejection]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Wraps a free-form database failure message.
    pub fn db_error(message: impl Into<String>) -> Self {
        ServiceError::DatabaseError(DbErr::Custom(message.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_)
            | Self::InsufficientStock(_)
            | Self::ProductUnavailable(_)
            | Self::InvalidTransition { .. }
            | Self::CouponRejected { .. }
            | Self::ConcurrentModification(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) | Self::Forbidden(_) => ErrorKind::Unauthorized,
            Self::ExternalServiceError(_) => ErrorKind::UpstreamFailure,
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_)
            | Self::InvalidTransition { .. }
            | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::InsufficientStock(_)
            | Self::ProductUnavailable(_)
            | Self::CouponRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::ConcurrentModification(id) => {
                format!("Concurrent modification for ID {}", id)
            }
            _ => self.to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let status = self.status_code();
        let details = match self {
            Self::CouponRejected { reasons, .. } => {
                Some(reasons.iter().map(|r| r.to_string()).collect())
            }
            _ => None,
        };
        ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            kind: self.kind(),
            message: self.response_message(),
            details,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
