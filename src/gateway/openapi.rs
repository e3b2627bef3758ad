//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::currency::Currency;
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::CreateAccountRequest;
use crate::store::{Account, Entry, Transfer};
use crate::transfer::{TransferParams, TransferResult};
use crate::user_auth::service::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};

/// Bearer JWT issued by `POST /users/login`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let mut scheme = Http::new(HttpAuthScheme::Bearer);
            scheme.bearer_format = Some("JWT".to_string());
            components.add_security_scheme("bearer_auth", SecurityScheme::Http(scheme));
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Simple Bank API",
        version = "1.0.0",
        description = "Accounts, users and atomic money transfers with a double-entry ledger."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::gateway::handlers::account::create_account,
        crate::gateway::handlers::account::get_account,
        crate::gateway::handlers::account::list_accounts,
        crate::gateway::handlers::account::list_account_entries,
        crate::gateway::handlers::transfer::create_transfer,
        crate::gateway::handlers::transfer::get_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            Currency,
            Account,
            Entry,
            Transfer,
            CreateAccountRequest,
            TransferParams,
            TransferResult,
            RegisterRequest,
            LoginRequest,
            UserResponse,
            LoginResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Sign-up and login"),
        (name = "Account", description = "Account queries (auth required)"),
        (name = "Transfer", description = "Money transfers (auth required)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;
