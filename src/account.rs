//! User identity and balance mutations.
//!
//! `credit` and `debit` are the only code paths that touch balance
//! fields; the transaction ledger and the operator endpoints go through
//! them rather than writing users directly.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rust_decimal::Decimal;

use crate::error::{ExchangeError, Result};
use crate::models::{Currency, User};
use crate::store::{KeyedLock, LedgerStore};

pub struct AccountService {
    store: Arc<LedgerStore>,
    locks: Arc<KeyedLock>,
}

impl AccountService {
    pub fn new(store: Arc<LedgerStore>, locks: Arc<KeyedLock>) -> Self {
        Self { store, locks }
    }

    /// Login, or create the account when `is_register` is set.
    ///
    /// Accounts registered without a password can log in by phone alone;
    /// once a password hash exists it is always verified.
    pub async fn login_or_register(
        &self,
        phone: &str,
        password: Option<&str>,
        is_register: bool,
    ) -> Result<User> {
        if phone.trim().is_empty() {
            return Err(ExchangeError::validation("phone is required"));
        }

        // Serializes duplicate registrations for the same phone.
        let _guard = self.locks.acquire(&format!("phone:{phone}")).await;
        let existing = self.store.get_user_by_phone(phone).await;

        if is_register {
            if existing.is_some() {
                return Err(ExchangeError::PhoneTaken);
            }
            let password_hash = password.map(hash_password).transpose()?;
            let user = User::new(phone, password_hash);
            self.store.put_user(&user).await;
            tracing::info!(user_id = %user.id, "registered new user");
            return Ok(user);
        }

        let user = existing.ok_or(ExchangeError::NotFound("user"))?;
        match (&user.password_hash, password) {
            (Some(hash), Some(password)) => verify_password(hash, password)?,
            (Some(_), None) => return Err(ExchangeError::InvalidCredentials),
            (None, _) => {}
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.store
            .get_user(user_id)
            .await
            .ok_or(ExchangeError::NotFound("user"))
    }

    /// Add `amount` to one of the user's balances.
    pub async fn credit(&self, user_id: &str, currency: Currency, amount: Decimal) -> Result<User> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::validation("amount must be positive"));
        }
        let _guard = self.locks.acquire(user_id).await;
        let mut user = self.get_user(user_id).await?;
        match currency {
            Currency::Usdt => user.balance_usdt += amount,
            Currency::Uah => user.balance_uah += amount,
        }
        self.store.put_user(&user).await;
        tracing::info!(user_id, %amount, currency = currency.as_str(), "balance credited");
        Ok(user)
    }

    /// Remove `amount` from one of the user's balances. The sufficient
    /// funds check and the write happen under the user's lock, so two
    /// concurrent debits cannot both pass against a stale balance.
    pub async fn debit(&self, user_id: &str, currency: Currency, amount: Decimal) -> Result<User> {
        if amount <= Decimal::ZERO {
            return Err(ExchangeError::validation("amount must be positive"));
        }
        let _guard = self.locks.acquire(user_id).await;
        let mut user = self.get_user(user_id).await?;
        let balance = match currency {
            Currency::Usdt => &mut user.balance_usdt,
            Currency::Uah => &mut user.balance_uah,
        };
        if *balance < amount {
            return Err(ExchangeError::InsufficientFunds);
        }
        *balance -= amount;
        self.store.put_user(&user).await;
        tracing::info!(user_id, %amount, currency = currency.as_str(), "balance debited");
        Ok(user)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ExchangeError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(hash: &str, password: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ExchangeError::Internal(format!("stored hash unreadable: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ExchangeError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(LedgerStore::memory_only()),
            Arc::new(KeyedLock::new()),
        )
    }

    #[tokio::test]
    async fn register_then_login_with_password() {
        let accounts = service();
        let user = accounts
            .login_or_register("0991234567", Some("s3cret"), true)
            .await
            .unwrap();
        assert_eq!(user.balance_usdt, Decimal::ZERO);
        assert!(user.password_hash.as_deref().unwrap().starts_with("$argon2"));

        let back = accounts
            .login_or_register("0991234567", Some("s3cret"), false)
            .await
            .unwrap();
        assert_eq!(back.id, user.id);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let accounts = service();
        accounts
            .login_or_register("0991234567", Some("s3cret"), true)
            .await
            .unwrap();
        let err = accounts
            .login_or_register("0991234567", Some("wrong"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidCredentials));
        let err = accounts
            .login_or_register("0991234567", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_register_is_conflict() {
        let accounts = service();
        accounts
            .login_or_register("0991234567", None, true)
            .await
            .unwrap();
        let err = accounts
            .login_or_register("0991234567", None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::PhoneTaken));
    }

    #[tokio::test]
    async fn login_unknown_phone_is_not_found() {
        let accounts = service();
        let err = accounts
            .login_or_register("0660000000", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::NotFound("user")));
    }

    #[tokio::test]
    async fn debit_cannot_go_negative() {
        let accounts = service();
        let user = accounts
            .login_or_register("0991234567", None, true)
            .await
            .unwrap();
        accounts
            .credit(&user.id, Currency::Usdt, dec!(50))
            .await
            .unwrap();

        let err = accounts
            .debit(&user.id, Currency::Usdt, dec!(51))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InsufficientFunds));
        // balance unchanged after the failed attempt
        assert_eq!(accounts.get_user(&user.id).await.unwrap().balance_usdt, dec!(50));

        let after = accounts
            .debit(&user.id, Currency::Usdt, dec!(50))
            .await
            .unwrap();
        assert_eq!(after.balance_usdt, Decimal::ZERO);
    }

    #[tokio::test]
    async fn concurrent_debits_cannot_double_spend() {
        let accounts = Arc::new(service());
        let user = accounts
            .login_or_register("0991234567", None, true)
            .await
            .unwrap();
        accounts
            .credit(&user.id, Currency::Usdt, dec!(100))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let accounts = accounts.clone();
            let user_id = user.id.clone();
            handles.push(tokio::spawn(async move {
                accounts.debit(&user_id, Currency::Usdt, dec!(60)).await
            }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(accounts.get_user(&user.id).await.unwrap().balance_usdt, dec!(40));
    }
}
