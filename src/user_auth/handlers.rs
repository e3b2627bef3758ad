use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::service::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, ApiResult, created, ok};

/// Register a new user
///
/// POST /users
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already exists"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<UserResponse> {
    let Json(req) = payload?;
    match state.user_auth.register(req).await {
        Ok(user) => created(user.into()),
        Err(e) => {
            tracing::warn!("Registration failed: {}", e);
            Err(e.into())
        }
    }
}

/// Login user
///
/// POST /users/login
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Unknown user"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(req) = payload?;
    let username = req.username.clone();
    match state.user_auth.login(req).await {
        Ok(resp) => ok(resp),
        Err(e) => {
            tracing::warn!(username = %username, "Login failed: {}", e);
            Err(e.into())
        }
    }
}
