//! Transfer handlers

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResponse, ApiResult, ok};
use crate::store::Transfer;
use crate::transfer::{Principal, TransferParams, TransferResult};

/// Move money between two accounts of the same currency
///
/// POST /transfers
///
/// The caller must own the source account.
#[utoipa::path(
    post,
    path = "/transfers",
    request_body = TransferParams,
    responses(
        (status = 200, description = "Transfer committed", body = ApiResponse<TransferResult>),
        (status = 400, description = "Invalid input, currency mismatch or insufficient funds"),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Source account owned by another user"),
        (status = 404, description = "Account not found"),
        (status = 499, description = "Client closed request"),
        (status = 500, description = "Internal error"),
        (status = 504, description = "Transfer timed out")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<TransferParams>, JsonRejection>,
) -> ApiResult<TransferResult> {
    let Json(params) = payload?;
    // Dropping this future (client gone) drops the open transaction with it
    match state.coordinator.execute(Some(&principal), params).await {
        Ok(result) => ok(result),
        Err(e) => Err(ApiError::from(e)),
    }
}

/// Fetch a transfer visible to the caller
///
/// GET /transfers/{id}
#[utoipa::path(
    get,
    path = "/transfers/{id}",
    params(("id" = i64, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer", body = ApiResponse<Transfer>),
        (status = 403, description = "Caller owns neither side"),
        (status = 404, description = "Transfer not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Transfer> {
    let Path(id) = id?;
    let transfer = state
        .store
        .get_transfer(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("transfer {} not found", id)))?;

    for account_id in [transfer.from_account_id, transfer.to_account_id] {
        let owned = state
            .store
            .get_account(account_id)
            .await?
            .is_some_and(|a| principal.owns(&a));
        if owned {
            return ok(transfer);
        }
    }
    ApiError::forbidden("transfer doesn't involve the authenticated user").into_err()
}
