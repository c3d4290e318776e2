//! swap-points server entry point.

use std::sync::Arc;
use std::time::Duration;

use swap_points::account::AccountService;
use swap_points::config::AppConfig;
use swap_points::gateway::{self, state::AppState};
use swap_points::ledger::TransactionLedger;
use swap_points::logging;
use swap_points::orders::OrderEngine;
use swap_points::rates::RateProvider;
use swap_points::store::{KeyedLock, LedgerBackend, LedgerStore, PostgresBackend};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(&get_env());
    let _guard = logging::init_logging(&config);

    let timeout = Duration::from_millis(config.store.timeout_ms);
    let durable: Option<Arc<dyn LedgerBackend>> = match &config.postgres_url {
        Some(url) => match PostgresBackend::connect(url, timeout).await {
            Ok(backend) => {
                backend.ensure_schema().await?;
                tracing::info!("durable backend connected");
                Some(Arc::new(backend))
            }
            Err(err) => {
                tracing::warn!(%err, "durable backend unreachable at startup, running in-memory only");
                None
            }
        },
        None => {
            tracing::info!("no postgres_url configured, running in-memory only");
            None
        }
    };

    let store = Arc::new(LedgerStore::new(durable, timeout));
    let locks = Arc::new(KeyedLock::new());
    let rates = Arc::new(RateProvider::new(store.clone(), locks.clone()));
    let accounts = Arc::new(AccountService::new(store.clone(), locks.clone()));
    let orders = Arc::new(OrderEngine::new(
        store.clone(),
        locks.clone(),
        rates.clone(),
        &config.exchange,
    ));
    let ledger = Arc::new(TransactionLedger::new(
        store.clone(),
        locks.clone(),
        accounts.clone(),
        rates.clone(),
    ));

    if config.admin_token.is_none() {
        tracing::warn!("no admin_token configured, operator endpoints are disabled");
    }

    let state = Arc::new(AppState {
        store,
        rates,
        accounts,
        orders,
        ledger,
        admin_token: config.admin_token.clone(),
    });

    gateway::run_server(&config.gateway, state).await
}
