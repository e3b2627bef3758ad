//! Simple Bank - accounts, users and atomic money transfers
//!
//! # Modules
//!
//! - [`currency`] - Supported currency codes
//! - [`store`] - Transactional account store (PostgreSQL and in-memory)
//! - [`db`] - Connection pool and schema bootstrap
//! - [`transfer`] - Transfer coordinator: lock ordering, retries, cancellation
//! - [`user_auth`] - Sign-up, login and JWT verification
//! - [`gateway`] - HTTP/JSON API with Swagger UI
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod currency;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod store;
pub mod transfer;
pub mod user_auth;

// Convenient re-exports at crate root
pub use currency::Currency;
pub use store::{Account, AccountId, Entry, MemoryStore, PgStore, Store, Transfer};
pub use transfer::{
    CoordinatorConfig, Principal, TransferCoordinator, TransferError, TransferParams,
    TransferResult,
};
