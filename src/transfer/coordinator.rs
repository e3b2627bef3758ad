//! Transfer Coordinator
//!
//! Moves funds between two accounts inside one store transaction.
//!
//! Every attempt locks both rows in canonical order (smaller id first),
//! re-verifies currency and ownership on the locked rows, writes the two
//! entries, applies the balance deltas in the same canonical order, then
//! records the transfer row. Serialisation conflicts re-run the whole
//! transactional body under [`RetryPolicy`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicI16, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::retry::RetryPolicy;
use super::state::TransferState;
use super::types::{Principal, TransferParams, TransferResult};
use crate::currency::Currency;
use crate::store::{Account, AccountId, Store, TxQuerier, with_tx};

/// Coordinator settings
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound for one `execute` call, retries included
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Permit the source balance to go negative
    pub allow_overdraft: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            allow_overdraft: false,
        }
    }
}

/// Validated transfer, owned so it can move into the transaction body
#[derive(Debug, Clone)]
struct TransferPlan {
    from_id: AccountId,
    to_id: AccountId,
    amount: i64,
    currency: Currency,
    principal: String,
    allow_overdraft: bool,
}

impl TransferPlan {
    /// `(first, second)`: every transfer over the same pair locks in this order
    #[inline]
    fn lock_order(&self) -> (AccountId, AccountId) {
        (self.from_id.min(self.to_id), self.from_id.max(self.to_id))
    }

    /// Balance deltas matching [`lock_order`](Self::lock_order)
    #[inline]
    fn deltas(&self) -> (i64, i64) {
        if self.from_id < self.to_id {
            (-self.amount, self.amount)
        } else {
            (self.amount, -self.amount)
        }
    }
}

/// Shared view of one execution's state, readable by the interrupt path
#[derive(Clone)]
struct Progress {
    state: Arc<AtomicI16>,
    from_id: AccountId,
    to_id: AccountId,
}

impl Progress {
    fn new(from_id: AccountId, to_id: AccountId) -> Self {
        Self {
            state: Arc::new(AtomicI16::new(TransferState::Init.id())),
            from_id,
            to_id,
        }
    }

    fn get(&self) -> TransferState {
        TransferState::from_id(self.state.load(Ordering::Acquire)).unwrap_or(TransferState::Init)
    }

    fn advance(&self, next: TransferState) {
        let current = self.get();
        if !current.can_transition_to(next) {
            warn!(
                from_account_id = self.from_id,
                to_account_id = self.to_id,
                state = %current,
                next = %next,
                "Unexpected transfer state transition"
            );
        }
        self.state.store(next.id(), Ordering::Release);
        debug!(
            from_account_id = self.from_id,
            to_account_id = self.to_id,
            "Transfer state: {} -> {}",
            current,
            next
        );
    }

    /// Settle a failed attempt into REJECTED or ROLLED_BACK
    fn fail(&self, err: &TransferError) -> TransferState {
        let current = self.get();
        if current.is_terminal() {
            return current;
        }
        let terminal = match current {
            TransferState::Init | TransferState::Validated => TransferState::Rejected,
            TransferState::Locked if err.is_rejection() => TransferState::Rejected,
            _ => TransferState::RolledBack,
        };
        self.advance(terminal);
        terminal
    }

    /// Next attempt re-runs the transactional body from the top
    fn restart(&self) {
        self.state
            .store(TransferState::Validated.id(), Ordering::Release);
    }
}

/// Transfer Coordinator
pub struct TransferCoordinator {
    store: Arc<dyn Store>,
    config: CoordinatorConfig,
}

impl TransferCoordinator {
    pub fn new(store: Arc<dyn Store>, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    /// Execute a transfer under the configured request timeout
    pub async fn execute(
        &self,
        principal: Option<&Principal>,
        params: TransferParams,
    ) -> Result<TransferResult, TransferError> {
        self.execute_with_cancel(principal, params, std::future::pending())
            .await
    }

    /// Execute a transfer, abandoning it when `cancel` resolves
    ///
    /// An interrupt before commit drops the open transaction, which rolls it
    /// back, and yields [`TransferError::Cancelled`] or
    /// [`TransferError::Timeout`]. Once the commit is in flight its real
    /// outcome is awaited and returned instead.
    pub async fn execute_with_cancel<C>(
        &self,
        principal: Option<&Principal>,
        params: TransferParams,
        cancel: C,
    ) -> Result<TransferResult, TransferError>
    where
        C: Future<Output = ()> + Send,
    {
        let progress = Progress::new(params.from_account_id, params.to_account_id);
        let work = self.run(principal, params, progress.clone());
        let deadline = tokio::time::sleep(self.config.request_timeout);
        tokio::pin!(work);
        tokio::pin!(deadline);
        tokio::pin!(cancel);

        let interrupt = tokio::select! {
            biased;
            result = &mut work => return result,
            _ = &mut cancel => TransferError::Cancelled,
            _ = &mut deadline => TransferError::Timeout,
        };

        if progress.get() == TransferState::Recorded {
            warn!(
                from_account_id = progress.from_id,
                to_account_id = progress.to_id,
                interrupt = %interrupt,
                "Interrupted during commit, awaiting outcome"
            );
            return work.await;
        }

        let state = progress.fail(&interrupt);
        warn!(
            from_account_id = progress.from_id,
            to_account_id = progress.to_id,
            state = %state,
            "Transfer abandoned: {}",
            interrupt
        );
        Err(interrupt)
    }

    async fn run(
        &self,
        principal: Option<&Principal>,
        params: TransferParams,
        progress: Progress,
    ) -> Result<TransferResult, TransferError> {
        let plan = match self.prepare(principal, &params).await {
            Ok(plan) => plan,
            Err(e) => {
                progress.fail(&e);
                info!(
                    from_account_id = params.from_account_id,
                    to_account_id = params.to_account_id,
                    code = e.code(),
                    "Transfer rejected: {}",
                    e
                );
                return Err(e);
            }
        };
        progress.advance(TransferState::Validated);

        let retry = self.config.retry;
        let mut attempt = 1u32;
        loop {
            let body_plan = plan.clone();
            let body_progress = progress.clone();
            let outcome = with_tx(self.store.as_ref(), move |q| {
                Box::pin(transfer_body(q, body_plan, body_progress))
            })
            .await;

            let e = match outcome {
                Ok(result) => {
                    progress.advance(TransferState::Committed);
                    info!(
                        transfer_id = result.transfer.id,
                        from_account_id = plan.from_id,
                        to_account_id = plan.to_id,
                        amount = plan.amount,
                        attempt,
                        "Transfer committed"
                    );
                    return Ok(result);
                }
                Err(e) => e,
            };

            let state = progress.fail(&e);
            if e.is_conflict() {
                if retry.should_retry(attempt) {
                    let delay = retry.backoff(attempt);
                    warn!(
                        from_account_id = plan.from_id,
                        to_account_id = plan.to_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Serialization conflict, retrying transfer"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    progress.restart();
                    continue;
                }
                error!(
                    from_account_id = plan.from_id,
                    to_account_id = plan.to_id,
                    attempts = attempt,
                    "Serialization conflicts exhausted retries"
                );
                return Err(TransferError::Internal(format!(
                    "transfer aborted after {} conflicting attempts",
                    attempt
                )));
            }

            if e.is_rejection() {
                info!(
                    from_account_id = plan.from_id,
                    to_account_id = plan.to_id,
                    state = %state,
                    code = e.code(),
                    "Transfer rejected: {}",
                    e
                );
            } else {
                error!(
                    from_account_id = plan.from_id,
                    to_account_id = plan.to_id,
                    state = %state,
                    "Transfer failed: {}",
                    e
                );
            }
            return Err(e);
        }
    }

    /// Input validation and early rejection from plain reads
    ///
    /// Everything checked here is checked again under lock.
    async fn prepare(
        &self,
        principal: Option<&Principal>,
        params: &TransferParams,
    ) -> Result<TransferPlan, TransferError> {
        let principal = principal.ok_or(TransferError::Unauthorised)?;

        if params.from_account_id < 1 || params.to_account_id < 1 {
            return Err(TransferError::InvalidInput(
                "account ids must be positive".into(),
            ));
        }
        if params.amount <= 0 {
            return Err(TransferError::InvalidInput(
                "amount must be greater than zero".into(),
            ));
        }
        if params.from_account_id == params.to_account_id {
            return Err(TransferError::InvalidInput(
                "source and destination account must differ".into(),
            ));
        }
        let currency: Currency = params
            .currency
            .parse()
            .map_err(|e: crate::currency::UnsupportedCurrency| {
                TransferError::InvalidInput(e.to_string())
            })?;

        let from = self
            .store
            .get_account(params.from_account_id)
            .await?
            .ok_or(TransferError::NotFound(params.from_account_id))?;
        let to = self
            .store
            .get_account(params.to_account_id)
            .await?
            .ok_or(TransferError::NotFound(params.to_account_id))?;

        check_currency(&from, &to, currency)?;
        if !principal.owns(&from) {
            return Err(TransferError::Forbidden(from.id));
        }

        Ok(TransferPlan {
            from_id: from.id,
            to_id: to.id,
            amount: params.amount,
            currency,
            principal: principal.username.clone(),
            allow_overdraft: self.config.allow_overdraft,
        })
    }
}

fn check_currency(from: &Account, to: &Account, currency: Currency) -> Result<(), TransferError> {
    if from.currency != to.currency {
        return Err(TransferError::CurrencyMismatch(format!(
            "account {} is {}, account {} is {}",
            from.id, from.currency, to.id, to.currency
        )));
    }
    if from.currency != currency {
        return Err(TransferError::CurrencyMismatch(format!(
            "accounts are {}, request is {}",
            from.currency, currency
        )));
    }
    Ok(())
}

/// Transactional body; runs once per attempt
async fn transfer_body(
    q: &mut dyn TxQuerier,
    plan: TransferPlan,
    progress: Progress,
) -> Result<TransferResult, TransferError> {
    let (first_id, second_id) = plan.lock_order();
    let first = q
        .get_account_for_update(first_id)
        .await?
        .ok_or(TransferError::NotFound(first_id))?;
    let second = if second_id == first_id {
        first.clone()
    } else {
        q.get_account_for_update(second_id)
            .await?
            .ok_or(TransferError::NotFound(second_id))?
    };
    let (from, to) = if first.id == plan.from_id {
        (first, second)
    } else {
        (second, first)
    };
    progress.advance(TransferState::Locked);

    check_currency(&from, &to, plan.currency)?;
    if from.owner != plan.principal {
        return Err(TransferError::Forbidden(from.id));
    }
    if !plan.allow_overdraft && from.balance < plan.amount {
        return Err(TransferError::InsufficientFunds {
            account_id: from.id,
            balance: from.balance,
            amount: plan.amount,
        });
    }
    if from.balance.checked_sub(plan.amount).is_none()
        || to.balance.checked_add(plan.amount).is_none()
    {
        return Err(TransferError::InvalidInput(
            "amount overflows account balance".into(),
        ));
    }

    let from_entry = q.create_entry(plan.from_id, -plan.amount).await?;
    let to_entry = q.create_entry(plan.to_id, plan.amount).await?;

    let (first_delta, second_delta) = plan.deltas();
    let (first_post, second_post) = if first_id == second_id {
        let combined = q
            .add_account_balance(first_id, first_delta + second_delta)
            .await?;
        (combined.clone(), combined)
    } else {
        let first_post = q.add_account_balance(first_id, first_delta).await?;
        let second_post = q.add_account_balance(second_id, second_delta).await?;
        (first_post, second_post)
    };
    let (from_account, to_account) = if first_post.id == plan.from_id {
        (first_post, second_post)
    } else {
        (second_post, first_post)
    };
    progress.advance(TransferState::Mutated);

    let transfer = q
        .create_transfer(plan.from_id, plan.to_id, plan.amount)
        .await?;
    progress.advance(TransferState::Recorded);

    Ok(TransferResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}
