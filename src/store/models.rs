//! Row types returned by the store
//!
//! Instances are read-only snapshots; every mutation goes back through a
//! [`Store`](super::Store) or [`TxQuerier`](super::TxQuerier).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::currency::Currency;

pub type AccountId = i64;

/// A balance holder in one currency, owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Account {
    pub id: AccountId,
    pub owner: String,
    /// Minor units (cents); may go negative only if overdraft is enabled
    pub balance: i64,
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

/// Append-only ledger line: debit negative, credit positive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Entry {
    pub id: i64,
    pub account_id: AccountId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Audit header for a pair of entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.from_account_id == account_id || self.to_account_id == account_id
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert parameters for [`Store::create_user`](super::Store::create_user)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}

/// Limit/offset window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Build from a 1-based page number
    pub fn new(page: u32, page_size: u32) -> Self {
        let limit = page_size as i64;
        Self {
            limit,
            offset: (page.saturating_sub(1) as i64) * limit,
        }
    }
}
