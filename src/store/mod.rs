//! Transactional account store
//!
//! The store is split into two capabilities:
//!
//! - [`TxQuerier`]: the row operations a transfer needs, bound to one open
//!   transaction (locking reads, relative balance mutation, ledger appends).
//! - [`Store`]: the shared, pool-backed handle. It answers plain queries and
//!   opens transactions via [`Store::begin`].
//!
//! [`with_tx`] runs a unit of work inside one transaction and guarantees that
//! exactly one of commit/rollback happened before it returns. Dropping an open
//! [`StoreTx`] (panic, cancelled future) also rolls back.
//!
//! Back-ends: [`PgStore`] (PostgreSQL via sqlx) and [`MemoryStore`] (in-process,
//! with real row locks; used by tests and local runs without a database).

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{Account, AccountId, Entry, NewUser, Page, Transfer, User};
pub use postgres::PgStore;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::currency::Currency;

/// Transaction isolation requested by [`Store::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Conflicts surface as [`StoreError::Conflict`] and are retried
    Serializable,
    /// Row locks taken by `FOR NO KEY UPDATE` in canonical order serialise
    /// transfers over the same accounts
    #[default]
    ReadCommitted,
}

impl IsolationLevel {
    pub fn set_statement(&self) -> &'static str {
        match self {
            IsolationLevel::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
            IsolationLevel::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
        }
    }
}

/// Row operations available inside one open transaction
///
/// Every call is a database round-trip and may block on row locks held by
/// other transactions.
#[async_trait]
pub trait TxQuerier: Send {
    /// Plain read; sees this transaction's own writes
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Read with an exclusive row lock held until commit/rollback
    async fn get_account_for_update(
        &mut self,
        id: AccountId,
    ) -> Result<Option<Account>, StoreError>;

    /// `balance := balance + delta`, returning the post-image.
    ///
    /// Overflowing `i64` is a [`StoreError::Database`] (bigint out of range).
    async fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError>;

    async fn create_entry(&mut self, account_id: AccountId, amount: i64)
    -> Result<Entry, StoreError>;

    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError>;
}

/// An open transaction checked out from a [`Store`]
///
/// Commit and rollback consume the transaction; any later call fails.
#[async_trait]
pub trait StoreTx: TxQuerier {
    fn querier(&mut self) -> &mut dyn TxQuerier;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Shared store handle (one per process, cloned behind `Arc`)
#[async_trait]
pub trait Store: Send + Sync {
    /// Check out one connection and open a transaction on it
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// New accounts start at balance 0
    async fn create_account(&self, owner: &str, currency: Currency)
    -> Result<Account, StoreError>;

    async fn list_accounts(&self, owner: &str, page: Page) -> Result<Vec<Account>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn list_entries(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Entry>, StoreError>;

    async fn get_transfer(&self, id: i64) -> Result<Option<Transfer>, StoreError>;
}

/// Run `work` inside a single transaction.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`.
/// A commit failure is surfaced as the result. If the returned future is
/// dropped mid-flight the transaction is dropped with it and rolled back.
pub async fn with_tx<S, T, E, F>(store: &S, work: F) -> Result<T, E>
where
    S: Store + ?Sized,
    E: From<StoreError>,
    F: for<'c> FnOnce(&'c mut dyn TxQuerier) -> BoxFuture<'c, Result<T, E>>,
{
    let mut tx = store.begin().await?;

    match work(tx.querier()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed after aborted transaction");
            }
            Err(e)
        }
    }
}
