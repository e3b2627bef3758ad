//! API envelope, error codes and request DTOs
//!
//! - `ApiResponse<T>`: unified response wrapper
//! - `error_codes`: numeric error code constants
//! - `ApiError`: any handler failure, rendered as an `ApiResponse<()>`

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::store::{Page, StoreError};
use crate::transfer::TransferError;
use crate::user_auth::AuthError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or absent (error)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_FUNDS: i32 = 1002;
    pub const CURRENCY_MISMATCH: i32 = 1003;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const FORBIDDEN: i32 = 2003;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4001;
    pub const ALREADY_EXISTS: i32 = 4009;
    pub const CANCELLED: i32 = 4990;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const TIMEOUT: i32 = 5004;
}

// ============================================================================
// ApiError
// ============================================================================

/// Handler error: HTTP status plus envelope code and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error_codes::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.code, self.msg))).into_response()
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let code = match &e {
            TransferError::InvalidInput(_) => error_codes::INVALID_PARAMETER,
            TransferError::Unauthorised => error_codes::MISSING_AUTH,
            TransferError::Forbidden(_) => error_codes::FORBIDDEN,
            TransferError::NotFound(_) => error_codes::NOT_FOUND,
            TransferError::CurrencyMismatch(_) => error_codes::CURRENCY_MISMATCH,
            TransferError::InsufficientFunds { .. } => error_codes::INSUFFICIENT_FUNDS,
            TransferError::Conflict(_) | TransferError::Internal(_) => error_codes::INTERNAL_ERROR,
            TransferError::Cancelled => error_codes::CANCELLED,
            TransferError::Timeout => error_codes::TIMEOUT,
        };
        // Internal details stay in the logs
        let msg = match &e {
            TransferError::Conflict(_) | TransferError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        Self::new(status(e.http_status()), code, msg)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let code = match &e {
            AuthError::Validation(_) => error_codes::INVALID_PARAMETER,
            AuthError::UserExists => error_codes::ALREADY_EXISTS,
            AuthError::UserNotFound => error_codes::NOT_FOUND,
            AuthError::InvalidCredentials | AuthError::InvalidToken => error_codes::AUTH_FAILED,
            AuthError::WeakSecret | AuthError::Store(_) | AuthError::Internal(_) => {
                tracing::error!("Auth failure: {}", e);
                return Self::internal("internal error");
            }
        };
        Self::new(status(e.http_status()), code, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(_) => Self::new(
                StatusCode::CONFLICT,
                error_codes::ALREADY_EXISTS,
                "resource already exists",
            ),
            StoreError::ForeignKeyViolation(_) => Self::forbidden("referenced owner does not exist"),
            StoreError::NotFound => Self::not_found("not found"),
            other => {
                tracing::error!("Store failure: {}", other);
                Self::internal("internal error")
            }
        }
    }
}

// Malformed bodies, paths and queries are client input errors (400), in the envelope
impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::bad_request(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::bad_request(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::bad_request(e.body_text())
    }
}

/// Handler result: success status plus envelope, or an [`ApiError`]
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 with data
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 with data
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

impl ApiError {
    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Pagination query (`page` ≥ 1, `page_size` 1-10)
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PageQuery {
    #[param(minimum = 1, example = 1)]
    pub page: u32,
    #[param(minimum = 1, maximum = 10, example = 5)]
    pub page_size: u32,
}

impl PageQuery {
    pub const MAX_PAGE_SIZE: u32 = 10;

    pub fn validate(self) -> Result<Page, ApiError> {
        if self.page < 1 {
            return Err(ApiError::bad_request("page must be at least 1"));
        }
        if self.page_size < 1 || self.page_size > Self::MAX_PAGE_SIZE {
            return Err(ApiError::bad_request(format!(
                "page_size must be between 1 and {}",
                Self::MAX_PAGE_SIZE
            )));
        }
        Ok(Page::new(self.page, self.page_size))
    }
}

/// Create Account Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    #[schema(example = "USD")]
    pub currency: String,
}
