//! PostgreSQL store (sqlx)

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::error::StoreError;
use super::models::{Account, AccountId, Entry, NewUser, Page, Transfer, User};
use super::{IsolationLevel, Store, StoreTx, TxQuerier};
use crate::currency::Currency;

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";

/// Pool-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    isolation: IsolationLevel,
}

impl PgStore {
    pub fn new(pool: PgPool, isolation: IsolationLevel) -> Self {
        Self { pool, isolation }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let mut tx = self.pool.begin().await?;
        // Must be the first statement of the transaction
        sqlx::query(self.isolation.set_statement())
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgTx { tx: Some(tx) }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_account(
        &self,
        owner: &str,
        currency: Currency,
    ) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (owner, currency) VALUES ($1, $2)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(owner)
        .bind(currency.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_accounts(&self, owner: &str, page: Page) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE owner = $1
             ORDER BY id LIMIT $2 OFFSET $3"
        ))
        .bind(owner)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, hashed_password, full_name, email)
               VALUES ($1, $2, $3, $4)
               RETURNING username, hashed_password, full_name, email,
                         password_changed_at, created_at"#,
        )
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"SELECT username, hashed_password, full_name, email,
                      password_changed_at, created_at
               FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_entries(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Entry>, StoreError> {
        let rows = sqlx::query_as::<_, Entry>(
            r#"SELECT id, account_id, amount, created_at FROM entries
               WHERE account_id = $1 ORDER BY id LIMIT $2 OFFSET $3"#,
        )
        .bind(account_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_transfer(&self, id: i64) -> Result<Option<Transfer>, StoreError> {
        let row = sqlx::query_as::<_, Transfer>(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// One open PostgreSQL transaction.
///
/// Dropping it without commit returns the connection to the pool with a
/// rollback queued (sqlx `Transaction` drop semantics).
pub struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Database("transaction already finished".into()))
    }
}

#[async_trait]
impl TxQuerier for PgTx {
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn get_account_for_update(
        &mut self,
        id: AccountId,
    ) -> Result<Option<Account>, StoreError> {
        let tx = self.conn()?;
        // NO KEY UPDATE: entries/transfers FK inserts take KEY SHARE and must not wait on it
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR NO KEY UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError> {
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts SET balance = balance + $2 WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, StoreError> {
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, Entry>(
            r#"INSERT INTO entries (account_id, amount) VALUES ($1, $2)
               RETURNING id, account_id, amount, created_at"#,
        )
        .bind(account_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        let tx = self.conn()?;
        let row = sqlx::query_as::<_, Transfer>(
            r#"INSERT INTO transfers (from_account_id, to_account_id, amount)
               VALUES ($1, $2, $3)
               RETURNING id, from_account_id, to_account_id, amount, created_at"#,
        )
        .bind(from_account_id)
        .bind(to_account_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    fn querier(&mut self) -> &mut dyn TxQuerier {
        self
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::Database("transaction already finished".into()))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::Database("transaction already finished".into()))?;
        tx.rollback().await?;
        Ok(())
    }
}
