use std::sync::Arc;

use crate::store::Store;
use crate::transfer::TransferCoordinator;
use crate::user_auth::UserAuthService;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Account / user / ledger queries
    pub store: Arc<dyn Store>,
    /// Money movement
    pub coordinator: Arc<TransferCoordinator>,
    /// Sign-up, login and token verification
    pub user_auth: Arc<UserAuthService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        coordinator: Arc<TransferCoordinator>,
        user_auth: Arc<UserAuthService>,
    ) -> Self {
        Self {
            store,
            coordinator,
            user_auth,
        }
    }
}
