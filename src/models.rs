//! Entity types shared by the store, the services and the gateway.
//!
//! Serde renames follow the wire shapes the frontend and admin panel
//! already consume (`balanceUSDT`, `amountUAH`, ...).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exchange direction of an order. The source currency is what the user
/// sends in; the payout side is always UAH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    UsdtToUah,
    TonToUah,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::UsdtToUah => "USDT_TO_UAH",
            Direction::TonToUah => "TON_TO_UAH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USDT_TO_UAH" => Some(Direction::UsdtToUah),
            "TON_TO_UAH" => Some(Direction::TonToUah),
            _ => None,
        }
    }
}

/// Balance currency. Orders may be funded in TON, but user balances only
/// exist in USDT and UAH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usdt,
    Uah,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usdt => "USDT",
            Currency::Uah => "UAH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USDT" => Some(Currency::Usdt),
            "UAH" => Some(Currency::Uah),
            _ => None,
        }
    }
}

/// Order lifecycle states.
///
/// `pending -> {confirmed, received, expired, cancelled}`,
/// `received -> confirmed`; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Received,
    Confirmed,
    Expired,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Received => "received",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Expired => "expired",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "received" => Some(OrderStatus::Received),
            "confirmed" => Some(OrderStatus::Confirmed),
            "expired" => Some(OrderStatus::Expired),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed | OrderStatus::Expired | OrderStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Deposit,
    Withdraw,
    Exchange,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Deposit => "deposit",
            TxType::Withdraw => "withdraw",
            TxType::Exchange => "exchange",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TxType::Deposit),
            "withdraw" => Some(TxType::Withdraw),
            "exchange" => Some(TxType::Exchange),
            _ => None,
        }
    }
}

/// Transaction status. `rejected` is the terminal state of a withdrawal
/// whose debit-on-request hold was returned by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TxStatus::Pending),
            "confirmed" => Some(TxStatus::Confirmed),
            "rejected" => Some(TxStatus::Rejected),
            _ => None,
        }
    }
}

/// A registered user and their internal balances.
///
/// Balances are mutated only through `AccountService::credit/debit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub phone: String,
    /// Argon2 PHC string. Never the raw password.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(rename = "balanceUSDT")]
    pub balance_usdt: Decimal,
    #[serde(rename = "balanceUAH")]
    pub balance_uah: Decimal,
    #[serde(rename = "totalExchanges")]
    pub total_exchanges: i64,
    #[serde(rename = "totalExchangedUAH")]
    pub total_exchanged_uah: Decimal,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(phone: &str, password_hash: Option<String>) -> Self {
        Self {
            id: unique_id("user_"),
            phone: phone.to_string(),
            password_hash,
            balance_usdt: Decimal::ZERO,
            balance_uah: Decimal::ZERO,
            total_exchanges: 0,
            total_exchanged_uah: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

/// A single exchange order. `amount_uah` and `rate` are frozen at
/// creation time and never recomputed against a later rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub direction: Direction,
    pub amount: Decimal,
    #[serde(rename = "amountUAH")]
    pub amount_uah: Decimal,
    pub rate: Decimal,
    #[serde(rename = "cardNumber")]
    pub card_number: String,
    #[serde(rename = "paymentAddress")]
    pub payment_address: String,
    pub status: OrderStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

/// A ledger entry mirroring a balance mutation (or a pending request
/// for one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(rename = "uahAmount")]
    pub uah_amount: Option<Decimal>,
    pub card: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub status: TxStatus,
    pub date: DateTime<Utc>,
}

/// The singleton conversion rate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rate {
    #[serde(rename = "USDT")]
    pub usdt: Decimal,
    #[serde(rename = "TON")]
    pub ton: Decimal,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Rate {
    /// Default rates used when no record exists yet.
    pub fn bootstrap() -> Self {
        Self {
            usdt: Decimal::from(46),
            ton: Decimal::from(80),
            updated_at: Utc::now(),
        }
    }

    /// Rate applied to an order's source currency.
    pub fn for_direction(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::UsdtToUah => self.usdt,
            Direction::TonToUah => self.ton,
        }
    }
}

/// Millisecond-stamped id with a short random suffix, e.g.
/// `dep_1700000000000_a3f9c1`.
pub fn unique_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}_{}", Utc::now().timestamp_millis(), &suffix[..6])
}
