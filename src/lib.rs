//! swap-points - operator-mediated USDT/TON to UAH exchange
//!
//! # Modules
//!
//! - [`models`] - entity types (User, Order, Transaction, Rate)
//! - [`store`] - durable-or-fallback ledger storage
//! - [`rates`] - conversion rate provider
//! - [`account`] - user identity and balance mutations
//! - [`orders`] - exchange order state machine
//! - [`ledger`] - deposit/withdraw transaction ledger
//! - [`gateway`] - HTTP surface (axum)

pub mod account;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod orders;
pub mod rates;
pub mod store;

// Convenient re-exports at crate root
pub use account::AccountService;
pub use error::ExchangeError;
pub use ledger::TransactionLedger;
pub use models::{Currency, Direction, Order, OrderStatus, Rate, Transaction, TxStatus, TxType, User};
pub use orders::OrderEngine;
pub use rates::RateProvider;
pub use store::{KeyedLock, LedgerBackend, LedgerStore, MemoryBackend, StoreHealth};
