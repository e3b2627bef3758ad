use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use simple_bank::config::AppConfig;
use simple_bank::db::{Database, schema};
use simple_bank::gateway::{self, state::AppState};
use simple_bank::store::{MemoryStore, PgStore, Store};
use simple_bank::transfer::TransferCoordinator;
use simple_bank::user_auth::UserAuthService;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let Some(url) = config.postgres_url.as_deref() else {
        tracing::warn!("postgres_url not set, using in-memory store (data is lost on exit)");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let db = Database::connect(url, config.postgres.max_connections)
        .await
        .context("Failed to connect to PostgreSQL")?;
    if config.postgres.init_schema {
        schema::init_schema(db.pool()).await?;
    }
    tracing::info!(isolation = ?config.transfer.isolation, "Using PostgreSQL store");
    Ok(Arc::new(PgStore::new(
        db.into_pool(),
        config.transfer.isolation,
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = simple_bank::logging::init_logging(&app_config)?;

    tracing::info!("Starting Simple Bank in {} mode", env);

    let store = build_store(&app_config).await?;

    let coordinator = Arc::new(TransferCoordinator::new(
        store.clone(),
        app_config.transfer.coordinator_config(),
    ));
    let user_auth = Arc::new(
        UserAuthService::new(
            store.clone(),
            app_config.auth.token_symmetric_key.clone(),
            Duration::from_secs(app_config.auth.access_token_duration_secs),
        )
        .context("Invalid auth configuration (token_symmetric_key must be >= 32 bytes)")?,
    );

    let state = Arc::new(AppState::new(store, coordinator, user_auth));
    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, state).await
}
