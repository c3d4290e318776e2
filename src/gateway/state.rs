use std::sync::Arc;

use crate::account::AccountService;
use crate::ledger::TransactionLedger;
use crate::orders::OrderEngine;
use crate::rates::RateProvider;
use crate::store::LedgerStore;

/// Shared gateway state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore>,
    pub rates: Arc<RateProvider>,
    pub accounts: Arc<AccountService>,
    pub orders: Arc<OrderEngine>,
    pub ledger: Arc<TransactionLedger>,
    /// Bearer token for /api/admin/*; admin routes reject everything
    /// while this is unset.
    pub admin_token: Option<String>,
}
