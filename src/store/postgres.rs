//! PostgreSQL durable backend.
//!
//! Runtime-bound queries; enum fields are stored as their wire strings
//! and re-parsed on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

use super::{BackendError, LedgerBackend};
use crate::models::{
    Currency, Direction, Order, OrderStatus, Rate, Transaction, TxStatus, TxType, User,
};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        phone TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        balance_usdt NUMERIC NOT NULL DEFAULT 0,
        balance_uah NUMERIC NOT NULL DEFAULT 0,
        total_exchanges BIGINT NOT NULL DEFAULT 0,
        total_exchanged_uah NUMERIC NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS orders (
        order_id TEXT PRIMARY KEY,
        direction TEXT NOT NULL,
        amount NUMERIC NOT NULL,
        amount_uah NUMERIC NOT NULL,
        rate NUMERIC NOT NULL,
        card_number TEXT NOT NULL,
        payment_address TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS transactions (
        tx_id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        tx_type TEXT NOT NULL,
        amount NUMERIC NOT NULL,
        currency TEXT NOT NULL,
        uah_amount NUMERIC,
        card TEXT,
        tx_hash TEXT,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS rates (
        id SMALLINT PRIMARY KEY DEFAULT 1 CHECK (id = 1),
        usdt NUMERIC NOT NULL,
        ton NUMERIC NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )"#,
];

pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_field<T>(parsed: Option<T>, column: &str, raw: &str) -> Result<T, BackendError> {
    parsed.ok_or_else(|| BackendError::Corrupt(format!("bad {column} value: {raw}")))
}

fn user_from_row(row: &PgRow) -> Result<User, BackendError> {
    Ok(User {
        id: row.get("user_id"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
        balance_usdt: row.get("balance_usdt"),
        balance_uah: row.get("balance_uah"),
        total_exchanges: row.get("total_exchanges"),
        total_exchanged_uah: row.get("total_exchanged_uah"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, BackendError> {
    let direction: String = row.get("direction");
    let status: String = row.get("status");
    Ok(Order {
        order_id: row.get("order_id"),
        direction: parse_field(Direction::parse(&direction), "direction", &direction)?,
        amount: row.get("amount"),
        amount_uah: row.get("amount_uah"),
        rate: row.get("rate"),
        card_number: row.get("card_number"),
        payment_address: row.get("payment_address"),
        status: parse_field(OrderStatus::parse(&status), "status", &status)?,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        expires_at: row.get::<DateTime<Utc>, _>("expires_at"),
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, BackendError> {
    let tx_type: String = row.get("tx_type");
    let currency: String = row.get("currency");
    let status: String = row.get("status");
    Ok(Transaction {
        id: row.get("tx_id"),
        user_id: row.get("user_id"),
        tx_type: parse_field(TxType::parse(&tx_type), "tx_type", &tx_type)?,
        amount: row.get("amount"),
        currency: parse_field(Currency::parse(&currency), "currency", &currency)?,
        uah_amount: row.get("uah_amount"),
        card: row.get("card"),
        tx_hash: row.get("tx_hash"),
        status: parse_field(TxStatus::parse(&status), "status", &status)?,
        date: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

#[async_trait]
impl LedgerBackend for PostgresBackend {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, BackendError> {
        let row = sqlx::query(r#"SELECT * FROM users WHERE user_id = $1"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, BackendError> {
        let row = sqlx::query(r#"SELECT * FROM users WHERE phone = $1"#)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn put_user(&self, user: &User) -> Result<(), BackendError> {
        sqlx::query(
            r#"INSERT INTO users
               (user_id, phone, password_hash, balance_usdt, balance_uah,
                total_exchanges, total_exchanged_uah, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (user_id) DO UPDATE SET
                 phone = EXCLUDED.phone,
                 password_hash = EXCLUDED.password_hash,
                 balance_usdt = EXCLUDED.balance_usdt,
                 balance_uah = EXCLUDED.balance_uah,
                 total_exchanges = EXCLUDED.total_exchanges,
                 total_exchanged_uah = EXCLUDED.total_exchanged_uah"#,
        )
        .bind(&user.id)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.balance_usdt)
        .bind(user.balance_uah)
        .bind(user.total_exchanges)
        .bind(user.total_exchanged_uah)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, BackendError> {
        let rows = sqlx::query(r#"SELECT * FROM users ORDER BY created_at DESC"#)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, BackendError> {
        let row = sqlx::query(r#"SELECT * FROM orders WHERE order_id = $1"#)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn put_order(&self, order: &Order) -> Result<(), BackendError> {
        sqlx::query(
            r#"INSERT INTO orders
               (order_id, direction, amount, amount_uah, rate, card_number,
                payment_address, status, created_at, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT (order_id) DO UPDATE SET status = EXCLUDED.status"#,
        )
        .bind(&order.order_id)
        .bind(order.direction.as_str())
        .bind(order.amount)
        .bind(order.amount_uah)
        .bind(order.rate)
        .bind(&order.card_number)
        .bind(&order.payment_address)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, BackendError> {
        let rows = sqlx::query(r#"SELECT * FROM orders ORDER BY created_at DESC"#)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn get_transaction(&self, tx_id: &str) -> Result<Option<Transaction>, BackendError> {
        let row = sqlx::query(r#"SELECT * FROM transactions WHERE tx_id = $1"#)
            .bind(tx_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn put_transaction(&self, tx: &Transaction) -> Result<(), BackendError> {
        sqlx::query(
            r#"INSERT INTO transactions
               (tx_id, user_id, tx_type, amount, currency, uah_amount, card,
                tx_hash, status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT (tx_id) DO UPDATE SET
                 status = EXCLUDED.status,
                 tx_hash = EXCLUDED.tx_hash"#,
        )
        .bind(&tx.id)
        .bind(&tx.user_id)
        .bind(tx.tx_type.as_str())
        .bind(tx.amount)
        .bind(tx.currency.as_str())
        .bind(tx.uah_amount)
        .bind(&tx.card)
        .bind(&tx.tx_hash)
        .bind(tx.status.as_str())
        .bind(tx.date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, BackendError> {
        let rows = sqlx::query(r#"SELECT * FROM transactions ORDER BY created_at DESC"#)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn transactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Transaction>, BackendError> {
        let rows = sqlx::query(
            r#"SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn oldest_pending_deposit(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> Result<Option<Transaction>, BackendError> {
        let row = sqlx::query(
            r#"SELECT * FROM transactions
               WHERE user_id = $1 AND tx_type = 'deposit'
                 AND status = 'pending' AND amount = $2
               ORDER BY created_at ASC
               LIMIT 1"#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn get_rate(&self) -> Result<Option<Rate>, BackendError> {
        let row = sqlx::query(r#"SELECT usdt, ton, updated_at FROM rates WHERE id = 1"#)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Rate {
            usdt: r.get("usdt"),
            ton: r.get("ton"),
            updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
        }))
    }

    async fn put_rate(&self, rate: &Rate) -> Result<(), BackendError> {
        sqlx::query(
            r#"INSERT INTO rates (id, usdt, ton, updated_at)
               VALUES (1, $1, $2, $3)
               ON CONFLICT (id) DO UPDATE SET
                 usdt = EXCLUDED.usdt,
                 ton = EXCLUDED.ton,
                 updated_at = EXCLUDED.updated_at"#,
        )
        .bind(rate.usdt)
        .bind(rate.ton)
        .bind(rate.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
