//! HTTP/JSON gateway
//!
//! Routing, bearer-token middleware and Swagger UI. Handlers translate
//! requests into store queries or coordinator calls and map failures through
//! [`types::ApiError`].

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use anyhow::Context;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth::middleware::jwt_auth_middleware;
use state::AppState;

/// Build the full router (public + authenticated routes + docs)
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Public Routes
    // ==========================================================================
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/users", post(crate::user_auth::handlers::register))
        .route("/users/login", post(crate::user_auth::handlers::login));

    // ==========================================================================
    // Private Routes (bearer JWT required)
    // ==========================================================================
    let private_routes = Router::new()
        .route(
            "/accounts",
            post(handlers::create_account).get(handlers::list_accounts),
        )
        .route("/accounts/{id}", get(handlers::get_account))
        .route("/accounts/{id}/entries", get(handlers::list_account_entries))
        .route("/transfers", post(handlers::create_transfer))
        .route("/transfers/{id}", get(handlers::get_transfer))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(private_routes)
        .with_state(state)
        // Stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Serve on an already-bound listener until the process stops
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    axum::serve(listener, app)
        .await
        .context("gateway server terminated")
}

/// Bind `host:port` and start the HTTP gateway
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {} (port already in use?)", addr))?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    serve(listener, state).await
}
