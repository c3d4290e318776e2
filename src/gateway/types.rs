//! Request/response DTOs for the HTTP surface.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Direction, Order, Rate, Transaction, User};

#[derive(Debug, Serialize)]
pub struct RatesView {
    #[serde(rename = "USDT")]
    pub usdt: Decimal,
    #[serde(rename = "TON")]
    pub ton: Decimal,
}

impl From<Rate> for RatesView {
    fn from(rate: Rate) -> Self {
        Self {
            usdt: rate.usdt,
            ton: rate.ton,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetRatesRequest {
    #[serde(rename = "USDT")]
    pub usdt: Option<Decimal>,
    #[serde(rename = "TON")]
    pub ton: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct SetRatesResponse {
    pub success: bool,
    pub rates: RatesView,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: Option<String>,
    #[serde(default, rename = "isRegister")]
    pub is_register: bool,
}

/// Public user view returned on login.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub phone: String,
    #[serde(rename = "balanceUSDT")]
    pub balance_usdt: Decimal,
    #[serde(rename = "balanceUAH")]
    pub balance_uah: Decimal,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            phone: user.phone,
            balance_usdt: user.balance_usdt,
            balance_uah: user.balance_uah,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalancesView {
    #[serde(rename = "balanceUSDT")]
    pub balance_usdt: Decimal,
    #[serde(rename = "balanceUAH")]
    pub balance_uah: Decimal,
    #[serde(rename = "totalExchanges")]
    pub total_exchanges: i64,
    #[serde(rename = "totalExchangedUAH")]
    pub total_exchanged_uah: Decimal,
}

impl From<User> for BalancesView {
    fn from(user: User) -> Self {
        Self {
            balance_usdt: user.balance_usdt,
            balance_uah: user.balance_uah,
            total_exchanges: user.total_exchanges,
            total_exchanged_uah: user.total_exchanged_uah,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DepositRequestResponse {
    pub success: bool,
    pub message: String,
    pub transaction: Transaction,
}

#[derive(Debug, Deserialize)]
pub struct DepositConfirmRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub amount: Decimal,
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}

#[derive(Debug, Serialize)]
pub struct DepositConfirmResponse {
    pub success: bool,
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub amount: Decimal,
    pub card: String,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub success: bool,
    pub transaction: Transaction,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub direction: Direction,
    pub amount: Decimal,
    #[serde(rename = "cardNumber")]
    pub card_number: String,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "paymentAddress")]
    pub payment_address: String,
    pub amount: Decimal,
    #[serde(rename = "amountUAH")]
    pub amount_uah: Decimal,
}

impl From<Order> for CreateOrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            payment_address: order.payment_address,
            amount: order.amount,
            amount_uah: order.amount_uah,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderStatusView {
    pub status: String,
    pub amount: Decimal,
    #[serde(rename = "amountUAH")]
    pub amount_uah: Decimal,
}

impl From<Order> for OrderStatusView {
    fn from(order: Order) -> Self {
        Self {
            status: order.status.as_str().to_string(),
            amount: order.amount,
            amount_uah: order.amount_uah,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsView {
    pub users: usize,
    pub orders: usize,
    pub transactions: usize,
    pub rates: RatesView,
    /// Store durability state: durable | degraded | memory-only.
    pub store: &'static str,
}
