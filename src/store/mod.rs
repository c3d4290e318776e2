//! Durable-or-fallback storage for users, orders, transactions and the
//! rate singleton.
//!
//! Every operation first attempts the durable backend under a bounded
//! timeout. On backend failure the call transparently falls back to the
//! process-lifetime in-memory mirror; health transitions are logged once
//! per episode and exposed via [`LedgerStore::health`]. The mirror is
//! never synchronized back into the durable backend — a degraded episode
//! is a durability loss window, not a cache.

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{Order, Rate, Transaction, User};
pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Observable durability state of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHealth {
    /// Durable backend reachable; writes survive a restart.
    Durable,
    /// Durable backend failing; serving from the in-memory mirror.
    Degraded,
    /// No durable backend configured at all.
    MemoryOnly,
}

impl StoreHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreHealth::Durable => "durable",
            StoreHealth::Degraded => "degraded",
            StoreHealth::MemoryOnly => "memory-only",
        }
    }
}

/// Typed storage contract implemented by both backends.
///
/// List results are newest-first; `oldest_pending_deposit` is the explicit
/// tie-break for deposit confirmation (oldest matching entry wins).
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, BackendError>;
    async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, BackendError>;
    async fn put_user(&self, user: &User) -> Result<(), BackendError>;
    async fn list_users(&self) -> Result<Vec<User>, BackendError>;

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, BackendError>;
    async fn put_order(&self, order: &Order) -> Result<(), BackendError>;
    async fn list_orders(&self) -> Result<Vec<Order>, BackendError>;

    async fn get_transaction(&self, tx_id: &str) -> Result<Option<Transaction>, BackendError>;
    async fn put_transaction(&self, tx: &Transaction) -> Result<(), BackendError>;
    async fn list_transactions(&self) -> Result<Vec<Transaction>, BackendError>;
    async fn transactions_for_user(&self, user_id: &str)
    -> Result<Vec<Transaction>, BackendError>;
    async fn oldest_pending_deposit(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Option<Transaction>, BackendError>;

    async fn get_rate(&self) -> Result<Option<Rate>, BackendError>;
    async fn put_rate(&self, rate: &Rate) -> Result<(), BackendError>;
}

/// Health-checked adapter over the durable backend with an in-memory
/// fallback. Infallible to callers: store unavailability never surfaces.
pub struct LedgerStore {
    durable: Option<Arc<dyn LedgerBackend>>,
    memory: MemoryBackend,
    degraded: AtomicBool,
    timeout: Duration,
}

impl LedgerStore {
    pub fn new(durable: Option<Arc<dyn LedgerBackend>>, timeout: Duration) -> Self {
        Self {
            durable,
            memory: MemoryBackend::new(),
            degraded: AtomicBool::new(false),
            timeout,
        }
    }

    /// Memory-only store, used when no durable backend is configured and
    /// throughout the test suite.
    pub fn memory_only() -> Self {
        Self::new(None, Duration::from_secs(2))
    }

    pub fn health(&self) -> StoreHealth {
        match (&self.durable, self.degraded.load(Ordering::SeqCst)) {
            (None, _) => StoreHealth::MemoryOnly,
            (Some(_), true) => StoreHealth::Degraded,
            (Some(_), false) => StoreHealth::Durable,
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        }
    }

    fn note_durable_ok(&self) {
        if self.degraded.swap(false, Ordering::SeqCst) {
            tracing::info!(
                "durable backend recovered; entities written during the degraded episode remain memory-only"
            );
        }
    }

    fn note_durable_err(&self, op: &str, err: &BackendError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(%err, op, "durable backend failed, serving from in-memory fallback");
        }
    }

    // Every accessor follows the same discipline: attempt durable, record
    // the health transition, fall back to the mirror. Durable reads that
    // return no row also consult the mirror so entities created during a
    // degraded episode stay reachable after recovery (read-through only).

    pub async fn get_user(&self, user_id: &str) -> Option<User> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.get_user(user_id)).await {
                Ok(found) => {
                    self.note_durable_ok();
                    if found.is_some() {
                        return found;
                    }
                }
                Err(err) => self.note_durable_err("get_user", &err),
            }
        }
        self.memory.user(user_id)
    }

    pub async fn get_user_by_phone(&self, phone: &str) -> Option<User> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.get_user_by_phone(phone)).await {
                Ok(found) => {
                    self.note_durable_ok();
                    if found.is_some() {
                        return found;
                    }
                }
                Err(err) => self.note_durable_err("get_user_by_phone", &err),
            }
        }
        self.memory.user_by_phone(phone)
    }

    pub async fn put_user(&self, user: &User) {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.put_user(user)).await {
                Ok(()) => {
                    self.note_durable_ok();
                    return;
                }
                Err(err) => self.note_durable_err("put_user", &err),
            }
        }
        self.memory.store_user(user);
    }

    pub async fn list_users(&self) -> Vec<User> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.list_users()).await {
                Ok(users) => {
                    self.note_durable_ok();
                    return users;
                }
                Err(err) => self.note_durable_err("list_users", &err),
            }
        }
        self.memory.users()
    }

    pub async fn get_order(&self, order_id: &str) -> Option<Order> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.get_order(order_id)).await {
                Ok(found) => {
                    self.note_durable_ok();
                    if found.is_some() {
                        return found;
                    }
                }
                Err(err) => self.note_durable_err("get_order", &err),
            }
        }
        self.memory.order(order_id)
    }

    pub async fn put_order(&self, order: &Order) {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.put_order(order)).await {
                Ok(()) => {
                    self.note_durable_ok();
                    return;
                }
                Err(err) => self.note_durable_err("put_order", &err),
            }
        }
        self.memory.store_order(order);
    }

    pub async fn list_orders(&self) -> Vec<Order> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.list_orders()).await {
                Ok(orders) => {
                    self.note_durable_ok();
                    return orders;
                }
                Err(err) => self.note_durable_err("list_orders", &err),
            }
        }
        self.memory.orders()
    }

    pub async fn get_transaction(&self, tx_id: &str) -> Option<Transaction> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.get_transaction(tx_id)).await {
                Ok(found) => {
                    self.note_durable_ok();
                    if found.is_some() {
                        return found;
                    }
                }
                Err(err) => self.note_durable_err("get_transaction", &err),
            }
        }
        self.memory.transaction(tx_id)
    }

    pub async fn put_transaction(&self, tx: &Transaction) {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.put_transaction(tx)).await {
                Ok(()) => {
                    self.note_durable_ok();
                    return;
                }
                Err(err) => self.note_durable_err("put_transaction", &err),
            }
        }
        self.memory.store_transaction(tx);
    }

    pub async fn list_transactions(&self) -> Vec<Transaction> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.list_transactions()).await {
                Ok(txs) => {
                    self.note_durable_ok();
                    return txs;
                }
                Err(err) => self.note_durable_err("list_transactions", &err),
            }
        }
        self.memory.all_transactions()
    }

    pub async fn transactions_for_user(&self, user_id: &str) -> Vec<Transaction> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.transactions_for_user(user_id)).await {
                Ok(txs) => {
                    self.note_durable_ok();
                    return txs;
                }
                Err(err) => self.note_durable_err("transactions_for_user", &err),
            }
        }
        self.memory.user_transactions(user_id)
    }

    pub async fn oldest_pending_deposit(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Option<Transaction> {
        if let Some(durable) = &self.durable {
            match self
                .bounded(durable.oldest_pending_deposit(user_id, amount))
                .await
            {
                Ok(found) => {
                    self.note_durable_ok();
                    if found.is_some() {
                        return found;
                    }
                }
                Err(err) => self.note_durable_err("oldest_pending_deposit", &err),
            }
        }
        self.memory.pending_deposit(user_id, amount)
    }

    pub async fn get_rate(&self) -> Option<Rate> {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.get_rate()).await {
                Ok(found) => {
                    self.note_durable_ok();
                    if found.is_some() {
                        return found;
                    }
                }
                Err(err) => self.note_durable_err("get_rate", &err),
            }
        }
        self.memory.rate()
    }

    pub async fn put_rate(&self, rate: &Rate) {
        if let Some(durable) = &self.durable {
            match self.bounded(durable.put_rate(rate)).await {
                Ok(()) => {
                    self.note_durable_ok();
                    return;
                }
                Err(err) => self.note_durable_err("put_rate", &err),
            }
        }
        self.memory.store_rate(rate);
    }
}

/// Per-entity-key async mutex. Guards every read-modify-write of a user
/// balance, order status or transaction status against concurrent
/// requests. Single-process mutual exclusion only; not reentrant.
#[derive(Default)]
pub struct KeyedLock {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(key.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        // Entries with strong count 1 are held by nobody (the guard keeps
        // its own Arc alive); dropping them keeps the map bounded by the
        // number of keys currently in use.
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        guard
    }
}
