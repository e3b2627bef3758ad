//! Money Transfer Core
//!
//! Moves value between two accounts of the same currency as one atomic unit:
//! two ledger entries, two balance deltas and one transfer row commit
//! together or not at all.
//!
//! # State Machine
//!
//! ```text
//! INIT → VALIDATED → LOCKED → MUTATED → RECORDED → COMMITTED
//!      ↘ REJECTED    (any stage before MUTATED)
//!      ↘ ROLLED_BACK (failure at or after LOCKED)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Canonical Lock Order**: rows are locked smaller id first, whatever the
//!    transfer direction, so A→B and B→A never deadlock
//! 2. **Check Under Lock**: currency, ownership and funds are re-verified on
//!    the locked rows; the pre-checks only give early, clear rejections
//! 3. **Relative Mutation**: balances change by `balance + delta`, never by
//!    writing back a value read earlier
//! 4. **Conservation**: the two entries of a transfer sum to zero

pub mod coordinator;
pub mod error;
pub mod retry;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use coordinator::{CoordinatorConfig, TransferCoordinator};
pub use error::TransferError;
pub use retry::RetryPolicy;
pub use state::TransferState;
pub use types::{Principal, TransferParams, TransferResult};
