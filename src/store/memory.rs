//! In-process store with PostgreSQL-like transaction semantics
//!
//! - `get_account_for_update` and `add_account_balance` take an exclusive
//!   per-row lock held until commit/rollback, so lock-order mistakes really
//!   deadlock here just as they would against the database.
//! - Writes are staged per transaction (read-your-writes) and published
//!   atomically on commit; dropping a transaction discards them.
//! - Serialisation conflicts and write failures can be injected to exercise
//!   retry and rollback paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::OwnedMutexGuard;

use super::error::StoreError;
use super::models::{Account, AccountId, Entry, NewUser, Page, Transfer, User};
use super::{Store, StoreTx, TxQuerier};
use crate::currency::Currency;

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
    users: HashMap<String, User>,
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: DashMap<AccountId, Arc<tokio::sync::Mutex<()>>>,
    next_account_id: AtomicI64,
    next_entry_id: AtomicI64,
    next_transfer_id: AtomicI64,
    pending_conflicts: AtomicUsize,
    pending_write_failures: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Shared {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Mutations are single inserts/appends, so a poisoned guard is still consistent
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_id(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory [`Store`] implementation
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account with an opening balance (fixture helper; skips the
    /// owner foreign-key check)
    pub fn seed_account(&self, owner: &str, currency: Currency, balance: i64) -> Account {
        let account = Account {
            id: Shared::next_id(&self.shared.next_account_id),
            owner: owner.to_string(),
            balance,
            currency,
            created_at: Utc::now(),
        };
        self.shared
            .tables()
            .accounts
            .insert(account.id, account.clone());
        account
    }

    /// Make the next `n` commits fail with [`StoreError::Conflict`]
    pub fn inject_conflicts(&self, n: usize) {
        self.shared.pending_conflicts.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` transfer-row inserts fail with a database error
    pub fn inject_write_failures(&self, n: usize) {
        self.shared.pending_write_failures.store(n, Ordering::SeqCst);
    }

    pub fn commit_count(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }

    /// Committed entries, in commit order
    pub fn all_entries(&self) -> Vec<Entry> {
        self.shared.tables().entries.clone()
    }

    /// Committed transfers, in commit order
    pub fn all_transfers(&self) -> Vec<Transfer> {
        self.shared.tables().transfers.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        Ok(Box::new(MemoryTx {
            shared: self.shared.clone(),
            held: HashMap::new(),
            balances: HashMap::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
            finished: false,
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.shared.tables().accounts.get(&id).cloned())
    }

    async fn create_account(
        &self,
        owner: &str,
        currency: Currency,
    ) -> Result<Account, StoreError> {
        let mut tables = self.shared.tables();
        if !tables.users.contains_key(owner) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "owner '{}' does not exist",
                owner
            )));
        }
        if tables
            .accounts
            .values()
            .any(|a| a.owner == owner && a.currency == currency)
        {
            return Err(StoreError::UniqueViolation(format!(
                "owner '{}' already has a {} account",
                owner, currency
            )));
        }
        let account = Account {
            id: Shared::next_id(&self.shared.next_account_id),
            owner: owner.to_string(),
            balance: 0,
            currency,
            created_at: Utc::now(),
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn list_accounts(&self, owner: &str, page: Page) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .shared
            .tables()
            .accounts
            .values()
            .filter(|a| a.owner == owner)
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.shared.tables();
        if tables.users.contains_key(&user.username)
            || tables.users.values().any(|u| u.email == user.email)
        {
            return Err(StoreError::UniqueViolation(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        let now = Utc::now();
        let row = User {
            username: user.username,
            hashed_password: user.hashed_password,
            full_name: user.full_name,
            email: user.email,
            password_changed_at: now,
            created_at: now,
        };
        tables.users.insert(row.username.clone(), row.clone());
        Ok(row)
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.shared.tables().users.get(username).cloned())
    }

    async fn list_entries(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .shared
            .tables()
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn get_transfer(&self, id: i64) -> Result<Option<Transfer>, StoreError> {
        Ok(self
            .shared
            .tables()
            .transfers
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }
}

/// One open in-memory transaction
pub struct MemoryTx {
    shared: Arc<Shared>,
    held: HashMap<AccountId, OwnedMutexGuard<()>>,
    /// Post-images of balances mutated by this transaction
    balances: HashMap<AccountId, i64>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
    finished: bool,
}

impl MemoryTx {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::Database("transaction already finished".into()));
        }
        Ok(())
    }

    /// Committed row overlaid with this transaction's own balance writes
    fn read(&self, id: AccountId) -> Option<Account> {
        let mut account = self.shared.tables().accounts.get(&id).cloned()?;
        if let Some(balance) = self.balances.get(&id) {
            account.balance = *balance;
        }
        Some(account)
    }

    fn exists(&self, id: AccountId) -> bool {
        self.shared.tables().accounts.contains_key(&id)
    }

    async fn lock_row(&mut self, id: AccountId) {
        if self.held.contains_key(&id) {
            return;
        }
        let lock = self.shared.row_locks.entry(id).or_default().clone();
        let guard = lock.lock_owned().await;
        self.held.insert(id, guard);
    }

    fn finish(&mut self) {
        self.finished = true;
        self.balances.clear();
        self.entries.clear();
        self.transfers.clear();
        self.held.clear();
    }
}

#[async_trait]
impl TxQuerier for MemoryTx {
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.ensure_open()?;
        Ok(self.read(id))
    }

    async fn get_account_for_update(
        &mut self,
        id: AccountId,
    ) -> Result<Option<Account>, StoreError> {
        self.ensure_open()?;
        if !self.exists(id) {
            return Ok(None);
        }
        self.lock_row(id).await;
        Ok(self.read(id))
    }

    async fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError> {
        self.ensure_open()?;
        if !self.exists(id) {
            return Err(StoreError::NotFound);
        }
        self.lock_row(id).await;
        let mut account = self.read(id).ok_or(StoreError::NotFound)?;
        account.balance = account
            .balance
            .checked_add(delta)
            .ok_or_else(|| StoreError::Database("bigint out of range".into()))?;
        self.balances.insert(id, account.balance);
        Ok(account)
    }

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, StoreError> {
        self.ensure_open()?;
        if !self.exists(account_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "account {} does not exist",
                account_id
            )));
        }
        let entry = Entry {
            id: Shared::next_id(&self.shared.next_entry_id),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        self.ensure_open()?;
        if Shared::take_one(&self.shared.pending_write_failures) {
            return Err(StoreError::Database("injected write failure".into()));
        }
        if amount <= 0 {
            return Err(StoreError::Database(
                "transfers_amount_check violated".into(),
            ));
        }
        for id in [from_account_id, to_account_id] {
            if !self.exists(id) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "account {} does not exist",
                    id
                )));
            }
        }
        let transfer = Transfer {
            id: Shared::next_id(&self.shared.next_transfer_id),
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    fn querier(&mut self) -> &mut dyn TxQuerier {
        self
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        if Shared::take_one(&self.shared.pending_conflicts) {
            self.finish();
            self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Conflict(
                "could not serialize access due to concurrent update".into(),
            ));
        }
        {
            let mut tables = self.shared.tables();
            for (id, balance) in self.balances.drain() {
                if let Some(account) = tables.accounts.get_mut(&id) {
                    account.balance = balance;
                }
            }
            tables.entries.append(&mut self.entries);
            tables.transfers.append(&mut self.transfers);
        }
        // Row locks are released only after the writes are visible
        self.finish();
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.finish();
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_read_your_writes_inside_tx() {
        let store = MemoryStore::new();
        let acc = store.seed_account("alice", Currency::Usd, 100);

        let mut tx = store.begin().await.unwrap();
        tx.add_account_balance(acc.id, -30).await.unwrap();
        assert_eq!(tx.get_account(acc.id).await.unwrap().unwrap().balance, 70);
        // Not visible outside until commit
        assert_eq!(store.get_account(acc.id).await.unwrap().unwrap().balance, 100);

        tx.commit().await.unwrap();
        assert_eq!(store.get_account(acc.id).await.unwrap().unwrap().balance, 70);
    }

    #[tokio::test]
    async fn test_drop_discards_staged_writes() {
        let store = MemoryStore::new();
        let acc = store.seed_account("alice", Currency::Usd, 100);

        {
            let mut tx = store.begin().await.unwrap();
            tx.add_account_balance(acc.id, 500).await.unwrap();
            tx.create_entry(acc.id, 500).await.unwrap();
        }

        assert_eq!(store.get_account(acc.id).await.unwrap().unwrap().balance, 100);
        assert!(store.all_entries().is_empty());
        assert_eq!(store.rollback_count(), 1);
    }

    #[tokio::test]
    async fn test_for_update_blocks_second_locker() {
        let store = MemoryStore::new();
        let id = store.seed_account("alice", Currency::Usd, 100).id;

        let mut tx1 = store.begin().await.unwrap();
        tx1.get_account_for_update(id).await.unwrap();

        let store2 = store.clone();
        let waiter = tokio::spawn(async move {
            let mut tx2 = store2.begin().await.unwrap();
            let seen = tx2.get_account_for_update(id).await.unwrap().unwrap();
            tx2.rollback().await.unwrap();
            seen.balance
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        tx1.add_account_balance(id, 5).await.unwrap();
        tx1.commit().await.unwrap();

        // Second locker sees the committed post-image
        assert_eq!(waiter.await.unwrap(), 105);
    }

    #[tokio::test]
    async fn test_missing_rows() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_account_for_update(42).await.unwrap().is_none());
        assert_eq!(
            tx.add_account_balance(42, 1).await.unwrap_err(),
            StoreError::NotFound
        );
        assert!(matches!(
            tx.create_entry(42, 1).await,
            Err(StoreError::ForeignKeyViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_finished_tx_rejects_calls() {
        let store = MemoryStore::new();
        let acc = store.seed_account("alice", Currency::Usd, 1);
        let mut tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();
        assert!(tx.get_account(acc.id).await.is_err());
        assert!(tx.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_create_account_constraints() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.create_account("ghost", Currency::Usd).await,
            Err(StoreError::ForeignKeyViolation(_))
        ));

        store
            .create_user(NewUser {
                username: "bob".into(),
                hashed_password: "x".into(),
                full_name: "Bob Smith".into(),
                email: "bob@example.com".into(),
            })
            .await
            .unwrap();

        let acc = store.create_account("bob", Currency::Eur).await.unwrap();
        assert_eq!(acc.balance, 0);
        assert!(matches!(
            store.create_account("bob", Currency::Eur).await,
            Err(StoreError::UniqueViolation(_))
        ));
        assert!(store.create_account("bob", Currency::Usd).await.is_ok());

        let page = store.list_accounts("bob", Page::new(1, 1)).await.unwrap();
        assert_eq!(page.len(), 1);
        let page2 = store.list_accounts("bob", Page::new(2, 1)).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_ne!(page[0].id, page2[0].id);
    }
}
