//! Deposit/withdraw transaction ledger.
//!
//! Every balance mutation flows through `AccountService`; this module
//! only decides when a mutation is due and records the mirroring
//! `Transaction` entry. Withdrawals follow the debit-on-request policy:
//! funds are reserved the moment the request is accepted, and an
//! operator can later return the hold through `reject_withdraw`.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::account::AccountService;
use crate::error::{ExchangeError, Result};
use crate::models::{Currency, Transaction, TxStatus, TxType, User, unique_id};
use crate::rates::RateProvider;
use crate::store::{KeyedLock, LedgerStore};

pub struct TransactionLedger {
    store: Arc<LedgerStore>,
    locks: Arc<KeyedLock>,
    accounts: Arc<AccountService>,
    rates: Arc<RateProvider>,
}

impl TransactionLedger {
    pub fn new(
        store: Arc<LedgerStore>,
        locks: Arc<KeyedLock>,
        accounts: Arc<AccountService>,
        rates: Arc<RateProvider>,
    ) -> Self {
        Self {
            store,
            locks,
            accounts,
            rates,
        }
    }

    /// Record a pending deposit. No balance effect until confirmation.
    pub async fn request_deposit(&self, user_id: &str, amount: Decimal) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::validation("amount must be positive"));
        }
        self.accounts.get_user(user_id).await?;

        let tx = Transaction {
            id: unique_id("dep_"),
            user_id: user_id.to_string(),
            tx_type: TxType::Deposit,
            amount,
            currency: Currency::Usdt,
            uah_amount: None,
            card: None,
            tx_hash: None,
            status: TxStatus::Pending,
            date: Utc::now(),
        };
        self.store.put_transaction(&tx).await;
        tracing::info!(tx_id = %tx.id, user_id, %amount, "deposit requested");
        Ok(tx)
    }

    /// Confirm the oldest pending deposit matching (user, amount) and
    /// credit the balance. Fails with NotFound when no match remains —
    /// confirmation must never create money.
    pub async fn confirm_deposit(
        &self,
        user_id: &str,
        amount: Decimal,
        tx_hash: &str,
    ) -> Result<User> {
        let _guard = self.locks.acquire(&format!("deposit:{user_id}")).await;
        self.accounts.get_user(user_id).await?;

        let tx = self
            .store
            .oldest_pending_deposit(user_id, amount)
            .await
            .ok_or(ExchangeError::NotFound("pending deposit"))?;

        let (tx, user) = self.settle_deposit(&tx.id, Some(tx_hash)).await?;
        tracing::info!(tx_id = %tx.id, user_id, %amount, "deposit confirmed");
        Ok(user)
    }

    /// Operator path: confirm one specific deposit by transaction id.
    /// Already-confirmed records are no longer pending, so a repeat call
    /// fails with NotFound instead of crediting twice.
    pub async fn confirm_deposit_by_id(&self, tx_id: &str) -> Result<Transaction> {
        let (tx, _) = self.settle_deposit(tx_id, None).await?;
        tracing::info!(tx_id, user_id = %tx.user_id, "deposit confirmed by operator");
        Ok(tx)
    }

    /// Both confirmation paths funnel through here: the per-transaction
    /// lock plus the pending re-check make crediting the same deposit
    /// twice impossible, whichever path the racing callers took.
    async fn settle_deposit(
        &self,
        tx_id: &str,
        tx_hash: Option<&str>,
    ) -> Result<(Transaction, User)> {
        let _guard = self.locks.acquire(&format!("tx:{tx_id}")).await;
        let mut tx = self.load(tx_id).await?;
        if tx.tx_type != TxType::Deposit || tx.status != TxStatus::Pending {
            return Err(ExchangeError::NotFound("pending deposit"));
        }

        let user = self
            .accounts
            .credit(&tx.user_id, Currency::Usdt, tx.amount)
            .await?;
        tx.status = TxStatus::Confirmed;
        if let Some(hash) = tx_hash {
            tx.tx_hash = Some(hash.to_string());
        }
        self.store.put_transaction(&tx).await;
        Ok((tx, user))
    }

    /// Debit-on-request withdrawal: the balance hold is taken here, the
    /// UAH amount is snapshotted against the current USDT rate, and a
    /// pending entry records the payout for the operator.
    pub async fn request_withdraw(
        &self,
        user_id: &str,
        amount: Decimal,
        card: &str,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::validation("amount must be positive"));
        }
        if card.trim().is_empty() {
            return Err(ExchangeError::validation("card is required"));
        }

        // debit is atomic under the user lock and carries the
        // sufficient-funds check
        self.accounts.debit(user_id, Currency::Usdt, amount).await?;

        let rate = self.rates.get().await.usdt;
        let tx = Transaction {
            id: unique_id("tx_"),
            user_id: user_id.to_string(),
            tx_type: TxType::Withdraw,
            amount,
            currency: Currency::Usdt,
            uah_amount: Some(amount * rate),
            card: Some(card.to_string()),
            tx_hash: None,
            status: TxStatus::Pending,
            date: Utc::now(),
        };
        self.store.put_transaction(&tx).await;
        tracing::info!(tx_id = %tx.id, user_id, %amount, "withdrawal requested, funds held");
        Ok(tx)
    }

    /// Operator marks the fiat payout done.
    pub async fn confirm_withdraw(&self, tx_id: &str) -> Result<Transaction> {
        let _guard = self.locks.acquire(&format!("tx:{tx_id}")).await;
        let mut tx = self.load(tx_id).await?;
        if tx.tx_type != TxType::Withdraw || tx.status != TxStatus::Pending {
            return Err(ExchangeError::NotFound("pending withdrawal"));
        }
        tx.status = TxStatus::Confirmed;
        self.store.put_transaction(&tx).await;
        tracing::info!(tx_id, user_id = %tx.user_id, "withdrawal confirmed");
        Ok(tx)
    }

    /// Explicit reconciliation for the debit-on-request policy: return
    /// the held funds and close the entry as rejected.
    pub async fn reject_withdraw(&self, tx_id: &str) -> Result<Transaction> {
        let _guard = self.locks.acquire(&format!("tx:{tx_id}")).await;
        let mut tx = self.load(tx_id).await?;
        if tx.tx_type != TxType::Withdraw || tx.status != TxStatus::Pending {
            return Err(ExchangeError::NotFound("pending withdrawal"));
        }

        self.accounts
            .credit(&tx.user_id, Currency::Usdt, tx.amount)
            .await?;
        tx.status = TxStatus::Rejected;
        self.store.put_transaction(&tx).await;
        tracing::info!(tx_id, user_id = %tx.user_id, "withdrawal rejected, hold returned");
        Ok(tx)
    }

    /// All of a user's transactions, most recent first. An unknown user
    /// simply has an empty history.
    pub async fn history(&self, user_id: &str) -> Vec<Transaction> {
        self.store.transactions_for_user(user_id).await
    }

    pub async fn list(&self) -> Vec<Transaction> {
        self.store.list_transactions().await
    }

    async fn load(&self, tx_id: &str) -> Result<Transaction> {
        self.store
            .get_transaction(tx_id)
            .await
            .ok_or(ExchangeError::NotFound("transaction"))
    }
}
