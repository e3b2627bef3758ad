//! Transfer Execution State Definitions

use std::fmt;

/// Transfer execution states
///
/// ```text
/// INIT → VALIDATED → LOCKED → MUTATED → RECORDED → COMMITTED
///      ↘ REJECTED    (any stage before MUTATED)
///      ↘ ROLLED_BACK (failure at or after LOCKED)
/// ```
///
/// Terminal states: COMMITTED (50), REJECTED (-10), ROLLED_BACK (-20)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TransferState {
    /// Request received
    Init = 0,

    /// Inputs, accounts, currency and ownership pre-checked
    Validated = 10,

    /// Both account rows locked in canonical order and re-verified
    Locked = 20,

    /// Entries written and balance deltas applied
    Mutated = 30,

    /// Transfer row written; commit pending
    Recorded = 40,

    /// Terminal: transaction committed
    Committed = 50,

    /// Terminal: refused before any mutation
    Rejected = -10,

    /// Terminal: transaction aborted, no effect persisted
    RolledBack = -20,
}

impl TransferState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Committed | TransferState::Rejected | TransferState::RolledBack
        )
    }

    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Init, Validated)
                | (Validated, Locked)
                | (Locked, Mutated)
                | (Mutated, Recorded)
                | (Recorded, Committed)
                | (Init | Validated | Locked, Rejected)
                | (Locked | Mutated | Recorded, RolledBack)
        )
    }

    /// Get the numeric state ID
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransferState::Init),
            10 => Some(TransferState::Validated),
            20 => Some(TransferState::Locked),
            30 => Some(TransferState::Mutated),
            40 => Some(TransferState::Recorded),
            50 => Some(TransferState::Committed),
            -10 => Some(TransferState::Rejected),
            -20 => Some(TransferState::RolledBack),
            _ => None,
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Init => "INIT",
            TransferState::Validated => "VALIDATED",
            TransferState::Locked => "LOCKED",
            TransferState::Mutated => "MUTATED",
            TransferState::Recorded => "RECORDED",
            TransferState::Committed => "COMMITTED",
            TransferState::Rejected => "REJECTED",
            TransferState::RolledBack => "ROLLED_BACK",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
