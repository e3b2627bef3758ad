//! Transfer Types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::{Account, AccountId, Entry, Transfer};

/// Authenticated identity bound to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    #[inline]
    pub fn owns(&self, account: &Account) -> bool {
        account.owner == self.username
    }
}

/// Coordinator input
///
/// `currency` stays a string so unknown codes are reported as invalid input
/// by the coordinator rather than as a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Minor units, must be positive
    pub amount: i64,
    #[schema(example = "USD")]
    pub currency: String,
}

/// Coordinator output: the transfer row and post-images of everything it touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}
