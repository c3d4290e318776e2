//! Conversion rate provider (singleton Rate record).

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::{ExchangeError, Result};
use crate::models::Rate;
use crate::store::{KeyedLock, LedgerStore};

const RATE_KEY: &str = "rate";

/// Shared-read, single-writer-at-a-time rate provider. Writers serialize
/// through the rate lock; last write wins.
pub struct RateProvider {
    store: Arc<LedgerStore>,
    locks: Arc<KeyedLock>,
}

impl RateProvider {
    pub fn new(store: Arc<LedgerStore>, locks: Arc<KeyedLock>) -> Self {
        Self { store, locks }
    }

    /// Current rates. Seeds the default record on first access.
    pub async fn get(&self) -> Rate {
        if let Some(rate) = self.store.get_rate().await {
            return rate;
        }
        let _guard = self.locks.acquire(RATE_KEY).await;
        if let Some(rate) = self.store.get_rate().await {
            return rate;
        }
        let rate = Rate::bootstrap();
        self.store.put_rate(&rate).await;
        tracing::info!(usdt = %rate.usdt, ton = %rate.ton, "seeded default rates");
        rate
    }

    /// Partial rate update; omitted fields keep their current value.
    pub async fn set(&self, usdt: Option<Decimal>, ton: Option<Decimal>) -> Result<Rate> {
        for value in [usdt, ton].into_iter().flatten() {
            if value <= Decimal::ZERO {
                return Err(ExchangeError::validation("rates must be positive"));
            }
        }

        let _guard = self.locks.acquire(RATE_KEY).await;
        let mut rate = self.store.get_rate().await.unwrap_or_else(Rate::bootstrap);
        if let Some(usdt) = usdt {
            rate.usdt = usdt;
        }
        if let Some(ton) = ton {
            rate.ton = ton;
        }
        rate.updated_at = Utc::now();
        self.store.put_rate(&rate).await;
        tracing::info!(usdt = %rate.usdt, ton = %rate.ton, "rates updated");
        Ok(rate)
    }
}
