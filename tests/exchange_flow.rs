//! End-to-end ledger and order scenarios against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use swap_points::account::AccountService;
use swap_points::config::ExchangeConfig;
use swap_points::error::ExchangeError;
use swap_points::ledger::TransactionLedger;
use swap_points::models::{Direction, OrderStatus, TxStatus, User};
use swap_points::orders::OrderEngine;
use swap_points::rates::RateProvider;
use swap_points::store::{KeyedLock, LedgerStore};

struct TestExchange {
    store: Arc<LedgerStore>,
    rates: Arc<RateProvider>,
    accounts: Arc<AccountService>,
    orders: Arc<OrderEngine>,
    ledger: Arc<TransactionLedger>,
}

fn exchange() -> TestExchange {
    let store = Arc::new(LedgerStore::memory_only());
    let locks = Arc::new(KeyedLock::new());
    let rates = Arc::new(RateProvider::new(store.clone(), locks.clone()));
    let accounts = Arc::new(AccountService::new(store.clone(), locks.clone()));
    let orders = Arc::new(OrderEngine::new(
        store.clone(),
        locks.clone(),
        rates.clone(),
        &ExchangeConfig::default(),
    ));
    let ledger = Arc::new(TransactionLedger::new(
        store.clone(),
        locks.clone(),
        accounts.clone(),
        rates.clone(),
    ));
    TestExchange {
        store,
        rates,
        accounts,
        orders,
        ledger,
    }
}

async fn register(ex: &TestExchange, phone: &str) -> User {
    ex.accounts.login_or_register(phone, None, true).await.unwrap()
}

#[tokio::test]
async fn deposit_confirm_withdraw_scenario() {
    let ex = exchange();
    let user = register(&ex, "0991234567").await;
    assert_eq!(user.balance_usdt, Decimal::ZERO);
    assert_eq!(user.balance_uah, Decimal::ZERO);

    let dep = ex.ledger.request_deposit(&user.id, dec!(100)).await.unwrap();
    assert_eq!(dep.status, TxStatus::Pending);
    assert!(dep.tx_hash.is_none());
    // no credit before confirmation
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        Decimal::ZERO
    );

    let after = ex
        .ledger
        .confirm_deposit(&user.id, dec!(100), "0xabc")
        .await
        .unwrap();
    assert_eq!(after.balance_usdt, dec!(100));
    let history = ex.ledger.history(&user.id).await;
    assert_eq!(history[0].status, TxStatus::Confirmed);
    assert_eq!(history[0].tx_hash.as_deref(), Some("0xabc"));

    let wd = ex
        .ledger
        .request_withdraw(&user.id, dec!(40), "4111111111111111")
        .await
        .unwrap();
    assert_eq!(wd.status, TxStatus::Pending);
    assert_eq!(wd.uah_amount, Some(dec!(1840))); // 40 x 46
    assert_eq!(wd.card.as_deref(), Some("4111111111111111"));
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        dec!(60)
    );
}

#[tokio::test]
async fn withdraw_insufficient_funds_leaves_balance_untouched() {
    let ex = exchange();
    let user = register(&ex, "0991234567").await;
    ex.ledger.request_deposit(&user.id, dec!(30)).await.unwrap();
    ex.ledger
        .confirm_deposit(&user.id, dec!(30), "0xdef")
        .await
        .unwrap();

    let err = ex
        .ledger
        .request_withdraw(&user.id, dec!(31), "4111111111111111")
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InsufficientFunds));
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        dec!(30)
    );
    // the failed attempt left no ledger entry
    let withdrawals: Vec<_> = ex
        .ledger
        .history(&user.id)
        .await
        .into_iter()
        .filter(|tx| tx.tx_type == swap_points::models::TxType::Withdraw)
        .collect();
    assert!(withdrawals.is_empty());
}

#[tokio::test]
async fn confirm_deposit_without_pending_match_is_not_found() {
    let ex = exchange();
    let user = register(&ex, "0991234567").await;
    ex.ledger.request_deposit(&user.id, dec!(100)).await.unwrap();
    ex.ledger
        .confirm_deposit(&user.id, dec!(100), "0xabc")
        .await
        .unwrap();

    // no pending match remains; must not silently create money
    let err = ex
        .ledger
        .confirm_deposit(&user.id, dec!(100), "0xabc")
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::NotFound(_)));
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        dec!(100)
    );
}

#[tokio::test]
async fn racing_deposit_confirmation_paths_credit_once() {
    let ex = exchange();
    let user = register(&ex, "0991234567").await;
    let dep = ex.ledger.request_deposit(&user.id, dec!(100)).await.unwrap();

    // the amount-match path and the operator by-id path target the same
    // pending record; only one may credit
    let amount_path = {
        let ledger = ex.ledger.clone();
        let user_id = user.id.clone();
        tokio::spawn(async move {
            ledger
                .confirm_deposit(&user_id, dec!(100), "0xrace")
                .await
                .is_ok()
        })
    };
    let by_id_path = {
        let ledger = ex.ledger.clone();
        let tx_id = dep.id.clone();
        tokio::spawn(async move { ledger.confirm_deposit_by_id(&tx_id).await.is_ok() })
    };

    let successes = [amount_path.await.unwrap(), by_id_path.await.unwrap()]
        .into_iter()
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        dec!(100)
    );

    // the single credit is mirrored by exactly one confirmed entry
    let history = ex.ledger.history(&user.id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, TxStatus::Confirmed);
}

#[tokio::test]
async fn confirm_deposit_picks_oldest_pending_first() {
    let ex = exchange();
    let user = register(&ex, "0991234567").await;
    let first = ex.ledger.request_deposit(&user.id, dec!(50)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = ex.ledger.request_deposit(&user.id, dec!(50)).await.unwrap();

    ex.ledger
        .confirm_deposit(&user.id, dec!(50), "0x1")
        .await
        .unwrap();

    let history = ex.ledger.history(&user.id).await;
    let confirmed = history.iter().find(|tx| tx.id == first.id).unwrap();
    let still_pending = history.iter().find(|tx| tx.id == second.id).unwrap();
    assert_eq!(confirmed.status, TxStatus::Confirmed);
    assert_eq!(still_pending.status, TxStatus::Pending);
}

#[tokio::test]
async fn reject_withdraw_returns_the_hold_exactly_once() {
    let ex = exchange();
    let user = register(&ex, "0991234567").await;
    ex.ledger.request_deposit(&user.id, dec!(100)).await.unwrap();
    ex.ledger
        .confirm_deposit(&user.id, dec!(100), "0xabc")
        .await
        .unwrap();
    let wd = ex
        .ledger
        .request_withdraw(&user.id, dec!(70), "4111111111111111")
        .await
        .unwrap();
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        dec!(30)
    );

    let rejected = ex.ledger.reject_withdraw(&wd.id).await.unwrap();
    assert_eq!(rejected.status, TxStatus::Rejected);
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        dec!(100)
    );

    // no second compensation
    let err = ex.ledger.reject_withdraw(&wd.id).await.unwrap_err();
    assert!(matches!(err, ExchangeError::NotFound(_)));
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        dec!(100)
    );
}

#[tokio::test]
async fn confirmed_withdraw_cannot_be_rejected() {
    let ex = exchange();
    let user = register(&ex, "0991234567").await;
    ex.ledger.request_deposit(&user.id, dec!(100)).await.unwrap();
    ex.ledger
        .confirm_deposit(&user.id, dec!(100), "0xabc")
        .await
        .unwrap();
    let wd = ex
        .ledger
        .request_withdraw(&user.id, dec!(70), "4111111111111111")
        .await
        .unwrap();

    ex.ledger.confirm_withdraw(&wd.id).await.unwrap();
    assert!(ex.ledger.reject_withdraw(&wd.id).await.is_err());
    assert_eq!(
        ex.accounts.get_user(&user.id).await.unwrap().balance_usdt,
        dec!(30)
    );
}

#[tokio::test]
async fn order_amount_uah_is_frozen_at_creation() {
    let ex = exchange();
    let order = ex
        .orders
        .create(Direction::UsdtToUah, dec!(10), "4111111111111111")
        .await
        .unwrap();
    assert_eq!(order.amount_uah, dec!(460)); // 10 x 46
    assert_eq!(order.rate, dec!(46));
    assert_eq!(order.status, OrderStatus::Pending);

    // a later rate update must not touch the stored order
    ex.rates.set(Some(dec!(50)), None).await.unwrap();
    let read_back = ex.orders.get_status(&order.order_id).await.unwrap();
    assert_eq!(read_back.amount_uah, dec!(460));
    assert_eq!(read_back.rate, dec!(46));

    // but new orders see the new rate
    let fresh = ex
        .orders
        .create(Direction::UsdtToUah, dec!(10), "4111111111111111")
        .await
        .unwrap();
    assert_eq!(fresh.amount_uah, dec!(500));
}

#[tokio::test]
async fn ton_orders_use_the_ton_rate() {
    let ex = exchange();
    let order = ex
        .orders
        .create(Direction::TonToUah, dec!(5), "4111111111111111")
        .await
        .unwrap();
    assert_eq!(order.amount_uah, dec!(400)); // 5 x 80
}

#[tokio::test]
async fn overdue_pending_order_expires_on_read() {
    let ex = exchange();
    let mut order = ex
        .orders
        .create(Direction::UsdtToUah, dec!(10), "4111111111111111")
        .await
        .unwrap();

    // simulate 31 minutes passing
    order.expires_at = Utc::now() - Duration::minutes(1);
    ex.store.put_order(&order).await;

    let read = ex.orders.get_status(&order.order_id).await.unwrap();
    assert_eq!(read.status, OrderStatus::Expired);
    // idempotent on the second read
    let again = ex.orders.get_status(&order.order_id).await.unwrap();
    assert_eq!(again.status, OrderStatus::Expired);

    // and an expired order cannot be settled
    assert!(ex.orders.confirm(&order.order_id).await.is_err());
    assert!(ex.orders.mark_received(&order.order_id).await.is_err());
}

#[tokio::test]
async fn confirm_is_idempotent() {
    let ex = exchange();
    let order = ex
        .orders
        .create(Direction::UsdtToUah, dec!(10), "4111111111111111")
        .await
        .unwrap();

    let first = ex.orders.confirm(&order.order_id).await.unwrap();
    assert_eq!(first.status, OrderStatus::Confirmed);
    let second = ex.orders.confirm(&order.order_id).await.unwrap();
    assert_eq!(second.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn received_path_follows_the_state_graph() {
    let ex = exchange();
    let order = ex
        .orders
        .create(Direction::UsdtToUah, dec!(10), "4111111111111111")
        .await
        .unwrap();

    let received = ex.orders.mark_received(&order.order_id).await.unwrap();
    assert_eq!(received.status, OrderStatus::Received);
    // received is not a valid source for received
    assert!(ex.orders.mark_received(&order.order_id).await.is_err());

    let confirmed = ex.orders.confirm(&order.order_id).await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    // terminal: no cancel, no received
    assert!(ex.orders.cancel(&order.order_id).await.is_err());
    assert!(ex.orders.mark_received(&order.order_id).await.is_err());
}

#[tokio::test]
async fn cancel_only_from_pending() {
    let ex = exchange();
    let order = ex
        .orders
        .create(Direction::UsdtToUah, dec!(10), "4111111111111111")
        .await
        .unwrap();

    let cancelled = ex.orders.cancel(&order.order_id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    // idempotent, but still not confirmable
    assert_eq!(
        ex.orders.cancel(&order.order_id).await.unwrap().status,
        OrderStatus::Cancelled
    );
    assert!(ex.orders.confirm(&order.order_id).await.is_err());
}

#[tokio::test]
async fn create_order_validates_input() {
    let ex = exchange();
    assert!(matches!(
        ex.orders
            .create(Direction::UsdtToUah, dec!(0), "4111111111111111")
            .await
            .unwrap_err(),
        ExchangeError::Validation(_)
    ));
    assert!(matches!(
        ex.orders
            .create(Direction::UsdtToUah, dec!(10), "  ")
            .await
            .unwrap_err(),
        ExchangeError::Validation(_)
    ));
    assert!(matches!(
        ex.orders.get_status("SWAP-0-missing").await.unwrap_err(),
        ExchangeError::NotFound("order")
    ));
}

#[tokio::test]
async fn deposit_request_requires_existing_user() {
    let ex = exchange();
    let err = ex
        .ledger
        .request_deposit("user_missing", dec!(10))
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::NotFound("user")));
}
