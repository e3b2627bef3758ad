//! Transfer Error Types

use thiserror::Error;

use crate::store::{AccountId, StoreError};

/// Transfer error types
///
/// Business rejections are detected either before the transaction opens or
/// under row lock; everything else aborts the transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Input Errors ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // === Authorisation Errors ===
    #[error("User not authenticated")]
    Unauthorised,

    #[error("Account {0} does not belong to the authenticated user")]
    Forbidden(AccountId),

    // === Account Errors ===
    #[error("Account {0} not found")]
    NotFound(AccountId),

    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),

    #[error("Insufficient funds in account {account_id}: balance {balance}, amount {amount}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: i64,
        amount: i64,
    },

    // === System Errors ===
    /// Serialisation failure; retried by the coordinator, never surfaced
    #[error("Serialization conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Transfer cancelled by caller")]
    Cancelled,

    #[error("Transfer timed out")]
    Timeout,
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidInput(_) => "INVALID_INPUT",
            TransferError::Unauthorised => "UNAUTHORISED",
            TransferError::Forbidden(_) => "FORBIDDEN",
            TransferError::NotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::CurrencyMismatch(_) => "CURRENCY_MISMATCH",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::Conflict(_) => "CONFLICT",
            TransferError::Internal(_) => "INTERNAL",
            TransferError::Cancelled => "CANCELLED",
            TransferError::Timeout => "TIMEOUT",
        }
    }

    /// Get HTTP status code
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidInput(_)
            | TransferError::CurrencyMismatch(_)
            | TransferError::InsufficientFunds { .. } => 400,
            TransferError::Unauthorised => 401,
            TransferError::Forbidden(_) => 403,
            TransferError::NotFound(_) => 404,
            TransferError::Cancelled => 499,
            TransferError::Conflict(_) | TransferError::Internal(_) => 500,
            TransferError::Timeout => 504,
        }
    }

    /// gRPC status code name (`tonic::Code` spelling)
    pub fn grpc_code(&self) -> &'static str {
        match self {
            TransferError::InvalidInput(_) => "InvalidArgument",
            TransferError::Unauthorised => "Unauthenticated",
            TransferError::Forbidden(_) => "PermissionDenied",
            TransferError::NotFound(_) => "NotFound",
            TransferError::CurrencyMismatch(_) | TransferError::InsufficientFunds { .. } => {
                "FailedPrecondition"
            }
            TransferError::Conflict(_) | TransferError::Internal(_) => "Internal",
            TransferError::Cancelled => "Cancelled",
            TransferError::Timeout => "DeadlineExceeded",
        }
    }

    /// Request was refused on its merits (nothing to roll back, never retried)
    #[inline]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidInput(_)
                | TransferError::Unauthorised
                | TransferError::Forbidden(_)
                | TransferError::NotFound(_)
                | TransferError::CurrencyMismatch(_)
                | TransferError::InsufficientFunds { .. }
        )
    }

    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, TransferError::Conflict(_))
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => TransferError::Conflict(msg),
            other => TransferError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::NotFound(7).code(), "ACCOUNT_NOT_FOUND");
        assert_eq!(
            TransferError::CurrencyMismatch("USD vs VND".into()).code(),
            "CURRENCY_MISMATCH"
        );
        assert_eq!(TransferError::Unauthorised.code(), "UNAUTHORISED");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidInput("x".into()).http_status(), 400);
        assert_eq!(TransferError::Unauthorised.http_status(), 401);
        assert_eq!(TransferError::Forbidden(1).http_status(), 403);
        assert_eq!(TransferError::NotFound(1).http_status(), 404);
        assert_eq!(TransferError::CurrencyMismatch("x".into()).http_status(), 400);
        let funds = TransferError::InsufficientFunds {
            account_id: 1,
            balance: 5,
            amount: 10,
        };
        assert_eq!(funds.http_status(), 400);
        assert_eq!(TransferError::Internal("x".into()).http_status(), 500);
        assert_eq!(TransferError::Timeout.http_status(), 504);
        assert_eq!(TransferError::Cancelled.http_status(), 499);
    }

    #[test]
    fn test_grpc_codes() {
        assert_eq!(TransferError::InvalidInput("x".into()).grpc_code(), "InvalidArgument");
        assert_eq!(TransferError::Unauthorised.grpc_code(), "Unauthenticated");
        assert_eq!(TransferError::Forbidden(1).grpc_code(), "PermissionDenied");
        assert_eq!(TransferError::NotFound(1).grpc_code(), "NotFound");
        assert_eq!(
            TransferError::CurrencyMismatch("x".into()).grpc_code(),
            "FailedPrecondition"
        );
        assert_eq!(TransferError::Internal("x".into()).grpc_code(), "Internal");
        assert_eq!(TransferError::Timeout.grpc_code(), "DeadlineExceeded");
    }

    #[test]
    fn test_store_error_conversion() {
        let conflict = TransferError::from(StoreError::Conflict("40001".into()));
        assert!(conflict.is_conflict());

        let other = TransferError::from(StoreError::ForeignKeyViolation("fk".into()));
        assert!(matches!(other, TransferError::Internal(_)));
        assert!(!other.is_rejection());
    }

    #[test]
    fn test_display() {
        let err = TransferError::InsufficientFunds {
            account_id: 1,
            balance: 5,
            amount: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds in account 1: balance 5, amount 10"
        );
    }
}
