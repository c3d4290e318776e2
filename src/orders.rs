//! Exchange order lifecycle.
//!
//! `pending -> {confirmed, received, expired, cancelled}`,
//! `received -> confirmed`; terminal states accept nothing further.
//! Expiry is evaluated lazily on every read and before every transition;
//! there is no background reaper.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::ExchangeConfig;
use crate::error::{ExchangeError, Result};
use crate::models::{Direction, Order, OrderStatus};
use crate::rates::RateProvider;
use crate::store::{KeyedLock, LedgerStore};

pub struct OrderEngine {
    store: Arc<LedgerStore>,
    locks: Arc<KeyedLock>,
    rates: Arc<RateProvider>,
    payment_address: String,
    ttl: Duration,
}

impl OrderEngine {
    pub fn new(
        store: Arc<LedgerStore>,
        locks: Arc<KeyedLock>,
        rates: Arc<RateProvider>,
        config: &ExchangeConfig,
    ) -> Self {
        Self {
            store,
            locks,
            rates,
            payment_address: config.payment_address.clone(),
            ttl: Duration::minutes(config.order_ttl_minutes),
        }
    }

    /// Create a pending order. The rate is snapshotted here and
    /// `amount_uah` is frozen for the order's lifetime.
    pub async fn create(
        &self,
        direction: Direction,
        amount: Decimal,
        card_number: &str,
    ) -> Result<Order> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::validation("amount must be positive"));
        }
        if card_number.trim().is_empty() {
            return Err(ExchangeError::validation("cardNumber is required"));
        }

        let rate = self.rates.get().await.for_direction(direction);
        let now = Utc::now();
        let order = Order {
            order_id: new_order_id(now),
            direction,
            amount,
            amount_uah: amount * rate,
            rate,
            card_number: card_number.to_string(),
            payment_address: self.payment_address.clone(),
            status: OrderStatus::Pending,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.put_order(&order).await;
        tracing::info!(order_id = %order.order_id, direction = direction.as_str(), %amount, "order created");
        Ok(order)
    }

    /// Read an order, transitioning it to `expired` first when its
    /// deadline has passed while still pending.
    pub async fn get_status(&self, order_id: &str) -> Result<Order> {
        let _guard = self.locks.acquire(&lock_key(order_id)).await;
        let mut order = self.load(order_id).await?;
        if expire_if_due(&mut order, Utc::now()) {
            self.store.put_order(&order).await;
            tracing::info!(order_id, "order expired");
        }
        Ok(order)
    }

    /// Operator saw the inbound transfer arrive. Pending orders only.
    pub async fn mark_received(&self, order_id: &str) -> Result<Order> {
        self.transition(order_id, |status| match status {
            OrderStatus::Pending => Transition::Move(OrderStatus::Received),
            other => Transition::Reject(other),
        })
        .await
    }

    /// Operator completed the payout. Idempotent: confirming an already
    /// confirmed order succeeds without a second write.
    pub async fn confirm(&self, order_id: &str) -> Result<Order> {
        self.transition(order_id, |status| match status {
            OrderStatus::Pending | OrderStatus::Received => {
                Transition::Move(OrderStatus::Confirmed)
            }
            OrderStatus::Confirmed => Transition::Keep,
            other => Transition::Reject(other),
        })
        .await
    }

    /// Cancel a pending order. Idempotent on already-cancelled.
    pub async fn cancel(&self, order_id: &str) -> Result<Order> {
        self.transition(order_id, |status| match status {
            OrderStatus::Pending => Transition::Move(OrderStatus::Cancelled),
            OrderStatus::Cancelled => Transition::Keep,
            other => Transition::Reject(other),
        })
        .await
    }

    pub async fn list(&self) -> Vec<Order> {
        self.store.list_orders().await
    }

    async fn load(&self, order_id: &str) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await
            .ok_or(ExchangeError::NotFound("order"))
    }

    /// Runs a guarded transition under the order's lock. Lazy expiry is
    /// applied first, so an overdue pending order can only expire.
    async fn transition(
        &self,
        order_id: &str,
        decide: impl Fn(OrderStatus) -> Transition,
    ) -> Result<Order> {
        let _guard = self.locks.acquire(&lock_key(order_id)).await;
        let mut order = self.load(order_id).await?;

        if expire_if_due(&mut order, Utc::now()) {
            self.store.put_order(&order).await;
            tracing::info!(order_id, "order expired");
        }

        match decide(order.status) {
            Transition::Move(next) => {
                let previous = order.status;
                order.status = next;
                self.store.put_order(&order).await;
                tracing::info!(
                    order_id,
                    from = previous.as_str(),
                    to = next.as_str(),
                    "order transition"
                );
                Ok(order)
            }
            Transition::Keep => Ok(order),
            Transition::Reject(current) => Err(ExchangeError::validation(format!(
                "order is {}, transition not allowed",
                current.as_str()
            ))),
        }
    }
}

enum Transition {
    Move(OrderStatus),
    Keep,
    Reject(OrderStatus),
}

/// `SWAP-{unix_millis}-{6 random hex}`.
fn new_order_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("SWAP-{}-{}", now.timestamp_millis(), &suffix[..6])
}

fn lock_key(order_id: &str) -> String {
    format!("order:{order_id}")
}

/// Lazy expiry: pending past the deadline becomes expired. Returns
/// whether the order changed.
fn expire_if_due(order: &mut Order, now: DateTime<Utc>) -> bool {
    if order.status == OrderStatus::Pending && now > order.expires_at {
        order.status = OrderStatus::Expired;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order(status: OrderStatus, expires_in_minutes: i64) -> Order {
        let now = Utc::now();
        Order {
            order_id: new_order_id(now),
            direction: Direction::UsdtToUah,
            amount: dec!(10),
            amount_uah: dec!(460),
            rate: dec!(46),
            card_number: "4111111111111111".to_string(),
            payment_address: "addr".to_string(),
            status,
            created_at: now,
            expires_at: now + Duration::minutes(expires_in_minutes),
        }
    }

    #[test]
    fn expiry_only_hits_overdue_pending() {
        let now = Utc::now();

        let mut overdue = sample_order(OrderStatus::Pending, -1);
        assert!(expire_if_due(&mut overdue, now));
        assert_eq!(overdue.status, OrderStatus::Expired);
        // second evaluation is a no-op
        assert!(!expire_if_due(&mut overdue, now));

        let mut fresh = sample_order(OrderStatus::Pending, 30);
        assert!(!expire_if_due(&mut fresh, now));
        assert_eq!(fresh.status, OrderStatus::Pending);

        let mut received = sample_order(OrderStatus::Received, -1);
        assert!(!expire_if_due(&mut received, now));
        assert_eq!(received.status, OrderStatus::Received);
    }

    #[test]
    fn order_ids_have_swap_prefix() {
        let id = new_order_id(Utc::now());
        assert!(id.starts_with("SWAP-"));
        assert_eq!(id.split('-').count(), 3);
    }
}
