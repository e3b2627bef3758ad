//! Transfer scenarios driven through the public crate API

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use simple_bank::store::{MemoryStore, Store};
use simple_bank::transfer::RetryPolicy;
use simple_bank::{
    CoordinatorConfig, Currency, Principal, TransferCoordinator, TransferError, TransferParams,
};

fn coordinator(store: &MemoryStore) -> Arc<TransferCoordinator> {
    let config = CoordinatorConfig {
        request_timeout: Duration::from_secs(5),
        retry: RetryPolicy::new(4, Duration::from_millis(1), Duration::from_millis(5)),
        allow_overdraft: false,
    };
    Arc::new(TransferCoordinator::new(Arc::new(store.clone()), config))
}

fn params(from: i64, to: i64, amount: i64) -> TransferParams {
    TransferParams {
        from_account_id: from,
        to_account_id: to,
        amount,
        currency: "USD".to_string(),
    }
}

async fn balance(store: &MemoryStore, id: i64) -> i64 {
    store.get_account(id).await.unwrap().unwrap().balance
}

#[tokio::test]
async fn scenario_simple_transfer_writes_balanced_ledger() {
    let store = MemoryStore::new();
    let a = store.seed_account("alice", Currency::Usd, 100).id;
    let b = store.seed_account("bob", Currency::Usd, 50).id;

    let result = coordinator(&store)
        .execute(Some(&Principal::new("alice")), params(a, b, 30))
        .await
        .unwrap();

    assert_eq!(result.from_account.balance, 70);
    assert_eq!(result.to_account.balance, 80);
    assert_eq!(result.from_entry.amount, -30);
    assert_eq!(result.to_entry.amount, 30);
    assert_eq!(result.transfer.amount, 30);

    let entries = store.all_entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.iter().map(|e| e.amount).sum::<i64>(), 0);
    assert_eq!(store.all_transfers().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_opposite_directions_do_not_deadlock() {
    let store = MemoryStore::new();
    let a = store.seed_account("alice", Currency::Usd, 100).id;
    let b = store.seed_account("bob", Currency::Usd, 100).id;
    let coord = coordinator(&store);

    let mut jobs = Vec::new();
    for i in 0..10 {
        let coord = coord.clone();
        let (from, to, who) = if i % 2 == 0 {
            (a, b, "alice")
        } else {
            (b, a, "bob")
        };
        jobs.push(tokio::spawn(async move {
            coord
                .execute(Some(&Principal::new(who)), params(from, to, 10))
                .await
        }));
    }

    let results = tokio::time::timeout(Duration::from_secs(10), join_all(jobs))
        .await
        .expect("interleaved transfers deadlocked");
    for r in results {
        r.unwrap().unwrap();
    }

    assert_eq!(balance(&store, a).await, 100);
    assert_eq!(balance(&store, b).await, 100);
    assert_eq!(store.all_entries().len(), 20);
}

#[tokio::test]
async fn scenario_insufficient_funds_leaves_no_trace() {
    let store = MemoryStore::new();
    let a = store.seed_account("alice", Currency::Usd, 100).id;
    let b = store.seed_account("bob", Currency::Usd, 50).id;

    let err = coordinator(&store)
        .execute(Some(&Principal::new("alice")), params(a, b, 101))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransferError::InsufficientFunds {
            balance: 100,
            amount: 101,
            ..
        }
    ));
    assert_eq!(err.http_status(), 400);
    assert_eq!(balance(&store, a).await, 100);
    assert_eq!(balance(&store, b).await, 50);
    assert!(store.all_entries().is_empty());
    assert!(store.all_transfers().is_empty());
}

#[tokio::test]
async fn scenario_cross_currency_is_rejected() {
    let store = MemoryStore::new();
    let a = store.seed_account("alice", Currency::Usd, 100).id;
    let b = store.seed_account("bob", Currency::Eur, 50).id;

    let err = coordinator(&store)
        .execute(Some(&Principal::new("alice")), params(a, b, 10))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::CurrencyMismatch(_)));
    assert!(store.all_entries().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_conservation_under_mixed_load() {
    let store = MemoryStore::new();
    let owners = ["alice", "bob", "carol"];
    let ids: Vec<i64> = owners
        .iter()
        .map(|o| store.seed_account(o, Currency::Usd, 100).id)
        .collect();
    let coord = coordinator(&store);

    let mut jobs = Vec::new();
    for i in 0..30usize {
        let coord = coord.clone();
        let from = i % 3;
        let to = (i + 1 + i / 3 % 2) % 3;
        let (from_id, to_id, who) = (ids[from], ids[to], owners[from]);
        jobs.push(tokio::spawn(async move {
            coord
                .execute(Some(&Principal::new(who)), params(from_id, to_id, 7))
                .await
        }));
    }
    let results = tokio::time::timeout(Duration::from_secs(10), join_all(jobs))
        .await
        .expect("mixed load deadlocked");

    let committed = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();

    let mut total = 0;
    for id in &ids {
        let b = balance(&store, *id).await;
        assert!(b >= 0, "account {} overdrawn: {}", id, b);
        total += b;
    }
    assert_eq!(total, 300);
    assert_eq!(store.all_transfers().len(), committed);
    assert_eq!(store.all_entries().len(), committed * 2);
    assert_eq!(store.all_entries().iter().map(|e| e.amount).sum::<i64>(), 0);
}
