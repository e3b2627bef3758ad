use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::gateway::{
    state::AppState,
    types::{ApiError, error_codes},
};
use crate::transfer::Principal;

/// Verify `Authorization: Bearer <jwt>` and inject the [`Principal`]
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                error_codes::MISSING_AUTH,
                "Missing Authorization header",
            )
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::new(
            StatusCode::UNAUTHORIZED,
            error_codes::AUTH_FAILED,
            "Invalid token format",
        )
    })?;

    // 2. Verify token
    let claims = state.user_auth.verify_token(token).map_err(|_| {
        ApiError::new(
            StatusCode::UNAUTHORIZED,
            error_codes::AUTH_FAILED,
            "Invalid or expired token",
        )
    })?;

    // 3. Inject principal
    request.extensions_mut().insert(Principal::new(claims.sub));
    Ok(next.run(request).await)
}
