//! Account handlers (owner-scoped)

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResponse, ApiResult, CreateAccountRequest, PageQuery, created, ok,
};
use crate::currency::Currency;
use crate::store::{Account, AccountId, Entry};
use crate::transfer::Principal;

/// Load an account and require the caller to own it
async fn owned_account(
    state: &AppState,
    principal: &Principal,
    id: AccountId,
) -> Result<Account, ApiError> {
    let account = state
        .store
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("account {} not found", id)))?;

    if !principal.owns(&account) {
        return Err(ApiError::forbidden(
            "account doesn't belong to the authenticated user",
        ));
    }
    Ok(account)
}

/// Open an account in one currency for the caller
///
/// POST /accounts
#[utoipa::path(
    post,
    path = "/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<Account>),
        (status = 400, description = "Unsupported currency"),
        (status = 401, description = "Authentication failed"),
        (status = 409, description = "Caller already has an account in this currency")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<Account> {
    let Json(req) = payload?;
    let currency: Currency = match req.currency.parse() {
        Ok(c) => c,
        Err(e) => return ApiError::bad_request(format!("{}", e)).into_err(),
    };

    let account = state
        .store
        .create_account(&principal.username, currency)
        .await?;
    tracing::info!(
        account_id = account.id,
        owner = %account.owner,
        currency = %account.currency,
        "Account created"
    );
    created(account)
}

/// Fetch one of the caller's accounts
///
/// GET /accounts/{id}
#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<Account>),
        (status = 403, description = "Account owned by another user"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    id: Result<Path<AccountId>, PathRejection>,
) -> ApiResult<Account> {
    let Path(id) = id?;
    ok(owned_account(&state, &principal, id).await?)
}

/// List the caller's accounts
///
/// GET /accounts?page=1&page_size=5
#[utoipa::path(
    get,
    path = "/accounts",
    params(PageQuery),
    responses(
        (status = 200, description = "Accounts, ordered by id", body = ApiResponse<Vec<Account>>),
        (status = 400, description = "Invalid page parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<Account>> {
    let Query(query) = query?;
    let page = query.validate()?;
    ok(state.store.list_accounts(&principal.username, page).await?)
}

/// List ledger entries of one of the caller's accounts
///
/// GET /accounts/{id}/entries?page=1&page_size=5
#[utoipa::path(
    get,
    path = "/accounts/{id}/entries",
    params(("id" = i64, Path, description = "Account id"), PageQuery),
    responses(
        (status = 200, description = "Entries, ordered by id", body = ApiResponse<Vec<Entry>>),
        (status = 403, description = "Account owned by another user"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Account"
)]
pub async fn list_account_entries(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    id: Result<Path<AccountId>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Vec<Entry>> {
    let Path(id) = id?;
    let Query(query) = query?;
    let page = query.validate()?;
    let account = owned_account(&state, &principal, id).await?;
    ok(state.store.list_entries(account.id, page).await?)
}
