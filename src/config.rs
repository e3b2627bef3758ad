use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::store::IsolationLevel;
use crate::transfer::{CoordinatorConfig, RetryPolicy};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL; without one the service runs on the in-memory store
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PostgresConfig {
    pub max_connections: u32,
    /// Create tables on startup if missing
    pub init_schema: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            init_schema: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret, at least 32 bytes
    pub token_symmetric_key: String,
    pub access_token_duration_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_symmetric_key: String::new(),
            access_token_duration_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TransferConfig {
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub allow_overdraft: bool,
    pub isolation: IsolationLevel,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            max_attempts: 8,
            base_backoff_ms: 10,
            max_backoff_ms: 200,
            allow_overdraft: false,
            isolation: IsolationLevel::ReadCommitted,
        }
    }
}

impl TransferConfig {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.base_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            ),
            allow_overdraft: self.allow_overdraft,
        }
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`, then apply environment overrides
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.postgres_url = Some(url);
        }
        if let Ok(key) = std::env::var("TOKEN_SYMMETRIC_KEY") {
            self.auth.token_symmetric_key = key;
        }
    }
}
