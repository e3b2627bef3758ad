//! HTTP handlers
//!
//! Public: health. Authenticated (bearer JWT): accounts and transfers.
//! User sign-up/login handlers live in [`crate::user_auth::handlers`].

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{create_account, get_account, list_account_entries, list_accounts};
pub use health::{HealthResponse, health_check};
pub use transfer::{create_transfer, get_transfer};
