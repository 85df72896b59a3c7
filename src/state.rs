//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::{services::balance_service::BalanceMutationService, store::rest::RestClient};

/// The balance service as wired for production.
pub type LedgerService = BalanceMutationService<RestClient>;

#[derive(Clone)]
pub struct AppState {
    /// Remote store client, used directly for authentication and health checks
    pub client: Arc<RestClient>,

    pub ledger: Arc<LedgerService>,
}

impl AppState {
    pub fn new(client: RestClient, retry_limit: u32) -> Self {
        let client = Arc::new(client);
        Self {
            ledger: Arc::new(BalanceMutationService::new(client.clone(), retry_limit)),
            client,
        }
    }
}
