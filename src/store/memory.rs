//! Process-lifetime in-memory backend.
//!
//! Used as the fallback mirror during degraded episodes and as the whole
//! store when no durable backend is configured. Nothing here survives a
//! restart.

use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::{BackendError, LedgerBackend};
use crate::models::{Order, Rate, Transaction, TxStatus, TxType, User};

#[derive(Default)]
pub struct MemoryBackend {
    users: DashMap<String, User>,
    orders: DashMap<String, Order>,
    transactions: DashMap<String, Transaction>,
    rate: RwLock<Option<Rate>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|entry| entry.clone())
    }

    pub fn user_by_phone(&self, phone: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| entry.phone == phone)
            .map(|entry| entry.clone())
    }

    pub fn store_user(&self, user: &User) {
        self.users.insert(user.id.clone(), user.clone());
    }

    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|entry| entry.clone())
    }

    pub fn store_order(&self, order: &Order) {
        self.orders.insert(order.order_id.clone(), order.clone());
    }

    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|entry| entry.clone()).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    pub fn transaction(&self, tx_id: &str) -> Option<Transaction> {
        self.transactions.get(tx_id).map(|entry| entry.clone())
    }

    pub fn store_transaction(&self, tx: &Transaction) {
        self.transactions.insert(tx.id.clone(), tx.clone());
    }

    pub fn all_transactions(&self) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> =
            self.transactions.iter().map(|entry| entry.clone()).collect();
        txs.sort_by(|a, b| b.date.cmp(&a.date));
        txs
    }

    pub fn user_transactions(&self, user_id: &str) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        txs.sort_by(|a, b| b.date.cmp(&a.date));
        txs
    }

    /// Oldest pending deposit matching (user, amount) — the tie-break used
    /// by deposit confirmation.
    pub fn pending_deposit(&self, user_id: &str, amount: Decimal) -> Option<Transaction> {
        let mut matches: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| {
                entry.user_id == user_id
                    && entry.tx_type == TxType::Deposit
                    && entry.status == TxStatus::Pending
                    && entry.amount == amount
            })
            .map(|entry| entry.clone())
            .collect();
        matches.sort_by(|a, b| a.date.cmp(&b.date));
        matches.into_iter().next()
    }

    pub fn rate(&self) -> Option<Rate> {
        self.rate.read().ok().and_then(|guard| guard.clone())
    }

    pub fn store_rate(&self, rate: &Rate) {
        if let Ok(mut guard) = self.rate.write() {
            *guard = Some(rate.clone());
        }
    }
}

#[async_trait]
impl LedgerBackend for MemoryBackend {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, BackendError> {
        Ok(self.user(user_id))
    }

    async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, BackendError> {
        Ok(self.user_by_phone(phone))
    }

    async fn put_user(&self, user: &User) -> Result<(), BackendError> {
        self.store_user(user);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, BackendError> {
        Ok(self.users())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, BackendError> {
        Ok(self.order(order_id))
    }

    async fn put_order(&self, order: &Order) -> Result<(), BackendError> {
        self.store_order(order);
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, BackendError> {
        Ok(self.orders())
    }

    async fn get_transaction(&self, tx_id: &str) -> Result<Option<Transaction>, BackendError> {
        Ok(self.transaction(tx_id))
    }

    async fn put_transaction(&self, tx: &Transaction) -> Result<(), BackendError> {
        self.store_transaction(tx);
        Ok(())
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, BackendError> {
        Ok(self.all_transactions())
    }

    async fn transactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Transaction>, BackendError> {
        Ok(self.user_transactions(user_id))
    }

    async fn oldest_pending_deposit(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Option<Transaction>, BackendError> {
        Ok(self.pending_deposit(user_id, amount))
    }

    async fn get_rate(&self) -> Result<Option<Rate>, BackendError> {
        Ok(self.rate())
    }

    async fn put_rate(&self, rate: &Rate) -> Result<(), BackendError> {
        self.store_rate(rate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, unique_id};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn deposit(user_id: &str, amount: Decimal, age_minutes: i64) -> Transaction {
        Transaction {
            id: unique_id("dep_"),
            user_id: user_id.to_string(),
            tx_type: TxType::Deposit,
            amount,
            currency: Currency::Usdt,
            uah_amount: None,
            card: None,
            tx_hash: None,
            status: TxStatus::Pending,
            date: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn pending_deposit_picks_oldest_match() {
        let backend = MemoryBackend::new();
        let older = deposit("user_1", dec!(100), 10);
        let newer = deposit("user_1", dec!(100), 1);
        let other_amount = deposit("user_1", dec!(50), 20);
        backend.store_transaction(&newer);
        backend.store_transaction(&older);
        backend.store_transaction(&other_amount);

        let found = backend.pending_deposit("user_1", dec!(100)).unwrap();
        assert_eq!(found.id, older.id);
    }

    #[test]
    fn pending_deposit_ignores_confirmed() {
        let backend = MemoryBackend::new();
        let mut tx = deposit("user_1", dec!(100), 5);
        tx.status = TxStatus::Confirmed;
        backend.store_transaction(&tx);
        assert!(backend.pending_deposit("user_1", dec!(100)).is_none());
    }

    #[test]
    fn user_transactions_newest_first() {
        let backend = MemoryBackend::new();
        let older = deposit("user_1", dec!(10), 30);
        let newer = deposit("user_1", dec!(20), 1);
        backend.store_transaction(&older);
        backend.store_transaction(&newer);
        backend.store_transaction(&deposit("user_2", dec!(5), 2));

        let txs = backend.user_transactions("user_1");
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].id, newer.id);
        assert_eq!(txs[1].id, older.id);
    }

    #[test]
    fn user_lookup_by_phone() {
        let backend = MemoryBackend::new();
        let user = User::new("0991234567", None);
        backend.store_user(&user);
        assert_eq!(backend.user_by_phone("0991234567").unwrap().id, user.id);
        assert!(backend.user_by_phone("0000000000").is_none());
    }
}
