//! Analytics error types with HTTP status code mapping.
//!
//! [`AnalyticsError`] is the only error that reaches handlers. Malformed
//! filter input never produces one (it is defaulted instead), so the
//! variants cover authentication, tenant scoping and storage failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// ```json
/// { "message": "not allowed to access the requested company", "code": 2001 }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub message: String,
    /// Numeric error code.
    pub code: u32,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Authentication  | 401 Unauthorized           |
/// | 2000–2999 | Authorization   | 403 Forbidden              |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// No valid tenant identity on the request.
    #[error("authentication required")]
    Unauthenticated,

    /// Tenant asked for a company or car outside its ownership.
    #[error("{0}")]
    Forbidden(String),

    /// Database query failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalyticsError {
    /// Refusal for a company the tenant does not own.
    #[must_use]
    pub fn company_not_allowed() -> Self {
        Self::Forbidden("not allowed to access the requested company".to_string())
    }

    /// Refusal for a car outside the tenant's companies.
    #[must_use]
    pub fn car_not_allowed() -> Self {
        Self::Forbidden("not allowed to access the requested car".to_string())
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Unauthenticated => 1001,
            Self::Forbidden(_) => 2001,
            Self::Storage(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AnalyticsError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl IntoResponse for AnalyticsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.error_code(),
            message: self.to_string(),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
