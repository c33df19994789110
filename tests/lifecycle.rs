//! End-to-end position lifecycle tests against the mock gateway.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio::sync::Mutex;

use futures_signal_trader::config::Config;
use futures_signal_trader::feed::PriceFeed;
use futures_signal_trader::gateway::mock::MockGateway;
use futures_signal_trader::gateway::{OrderStatus, ResilientInvoker, Side};
use futures_signal_trader::signal::TradeSignal;
use futures_signal_trader::trading::{Position, PositionEngine, PositionSide};

const POLL: Duration = Duration::from_millis(100);

fn test_config() -> Config {
    Config {
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
        symbol: "ETHUSDT".to_string(),
        leverage: 4,
        long_stoploss_pct: dec!(5),
        long_takeprofit_pct: Some(dec!(5)),
        short_stoploss_pct: dec!(5),
        short_takeprofit_pct: Some(dec!(5)),
        safety_factor: dec!(0.05),
        monitor_poll_ms: POLL.as_millis() as u64,
        rest_url: "https://fapi.binance.com".to_string(),
        ws_url: "wss://fstream.binance.com".to_string(),
        recv_window_ms: 6000,
        port: 5500,
        rust_log: "info".to_string(),
    }
}

struct Fixture {
    engine: PositionEngine<MockGateway>,
    gateway: Arc<MockGateway>,
    feed: PriceFeed,
    position: Arc<Mutex<Position>>,
}

fn fixture() -> Fixture {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_balance(dec!(1000));
    gateway.set_fill_price(dec!(100));

    let feed = PriceFeed::new();
    feed.publish(dec!(100));

    let position = Arc::new(Mutex::new(Position::flat()));
    let engine = PositionEngine::new(
        &test_config(),
        ResilientInvoker::new(Arc::clone(&gateway)),
        feed.clone(),
        Arc::clone(&position),
    );

    Fixture {
        engine,
        gateway,
        feed,
        position,
    }
}

#[tokio::test(start_paused = true)]
async fn enter_long_opens_sized_position_with_protection() {
    let mut fx = fixture();

    fx.engine.apply(TradeSignal::EnterLong).await;

    // 1000 USDT * 4x / 100, 5% safety discount -> 38.000.
    assert_eq!(
        fx.gateway.market_orders(),
        vec![("ETHUSDT".to_string(), Side::Buy, dec!(38.000))]
    );
    assert_eq!(
        fx.gateway.limit_orders(),
        vec![("ETHUSDT".to_string(), Side::Sell, dec!(38.000), dec!(105.00))]
    );

    let pos = fx.position.lock().await.clone();
    assert_eq!(pos.side, PositionSide::Long);
    assert_eq!(pos.entry_price, dec!(100));
    assert_eq!(pos.quantity, dec!(38.000));
    assert_eq!(pos.stop_loss, dec!(95.00));
    assert_eq!(pos.take_profit, Some(dec!(105.00)));
    assert!(pos.take_profit_order_id.is_some());
    assert!(fx.engine.has_monitor());
}

#[tokio::test(start_paused = true)]
async fn repeated_signal_is_idempotent() {
    let mut fx = fixture();

    fx.engine.apply(TradeSignal::EnterLong).await;
    fx.engine.apply(TradeSignal::EnterLong).await;

    assert_eq!(fx.gateway.calls_named("market_order"), 1);
    assert_eq!(fx.gateway.calls_named("limit_order"), 1);
    assert_eq!(fx.position.lock().await.side, PositionSide::Long);
}

#[tokio::test(start_paused = true)]
async fn flip_exits_with_recorded_quantity_then_reenters() {
    let mut fx = fixture();

    fx.engine.apply(TradeSignal::EnterLong).await;

    // Balance change after entry must not affect the exit quantity.
    fx.gateway.set_balance(dec!(500));

    fx.engine.apply(TradeSignal::EnterShort).await;

    let markets = fx.gateway.market_orders();
    assert_eq!(markets.len(), 3);
    // Entry long.
    assert_eq!(markets[0], ("ETHUSDT".to_string(), Side::Buy, dec!(38.000)));
    // Exit uses the recorded entry quantity, not a re-sized one.
    assert_eq!(markets[1], ("ETHUSDT".to_string(), Side::Sell, dec!(38.000)));
    // Fresh short sized from the new balance: 500 * 4 / 100 = 20, -5% = 19.
    assert_eq!(markets[2], ("ETHUSDT".to_string(), Side::Sell, dec!(19.000)));

    // The long's take-profit was cancelled before the exit.
    assert_eq!(fx.gateway.calls_named("cancel_order"), 1);

    let pos = fx.position.lock().await.clone();
    assert_eq!(pos.side, PositionSide::Short);
    assert_eq!(pos.quantity, dec!(19.000));
    assert_eq!(pos.stop_loss, dec!(105.00));
    assert_eq!(pos.take_profit, Some(dec!(95.00)));
}

#[tokio::test(start_paused = true)]
async fn flatten_closes_and_further_flatten_is_noop() {
    let mut fx = fixture();

    fx.engine.apply(TradeSignal::EnterLong).await;
    fx.engine.apply(TradeSignal::Flatten).await;

    let markets = fx.gateway.market_orders();
    assert_eq!(markets.len(), 2);
    assert_eq!(markets[1], ("ETHUSDT".to_string(), Side::Sell, dec!(38.000)));
    assert!(fx.position.lock().await.is_flat());
    assert!(!fx.engine.has_monitor());

    fx.engine.apply(TradeSignal::Flatten).await;
    assert_eq!(fx.gateway.market_orders().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn partial_entry_fill_quantity_flows_through_exit() {
    let mut fx = fixture();
    fx.gateway.script_market_fill(dec!(100), dec!(37.5));

    fx.engine.apply(TradeSignal::EnterLong).await;

    let pos = fx.position.lock().await.clone();
    assert_eq!(pos.quantity, dec!(37.5));
    assert_eq!(
        fx.gateway.limit_orders()[0],
        ("ETHUSDT".to_string(), Side::Sell, dec!(37.5), dec!(105.00))
    );

    fx.engine.apply(TradeSignal::Flatten).await;
    assert_eq!(
        fx.gateway.market_orders()[1],
        ("ETHUSDT".to_string(), Side::Sell, dec!(37.5))
    );
}

#[tokio::test(start_paused = true)]
async fn entry_retries_through_transient_failures() {
    let mut fx = fixture();
    fx.gateway.fail_next_market_orders(2);

    fx.engine.apply(TradeSignal::EnterLong).await;

    // Two failures plus the success.
    assert_eq!(fx.gateway.calls_named("market_order"), 3);
    assert_eq!(fx.position.lock().await.side, PositionSide::Long);
}

#[tokio::test(start_paused = true)]
async fn stop_loss_flattens_and_allows_reentry() {
    let mut fx = fixture();

    fx.engine.apply(TradeSignal::EnterLong).await;
    assert_eq!(fx.position.lock().await.side, PositionSide::Long);

    // Stop level is 95; cross it and let the monitor tick.
    fx.feed.publish(dec!(94.50));
    tokio::time::sleep(POLL * 3).await;

    assert!(fx.position.lock().await.is_flat());
    // Entry, then the monitor's market exit.
    assert_eq!(fx.gateway.calls_named("market_order"), 2);
    assert_eq!(fx.gateway.calls_named("cancel_order"), 1);

    // A new signal can re-enter from flat.
    fx.feed.publish(dec!(100));
    fx.engine.apply(TradeSignal::EnterLong).await;
    assert_eq!(fx.position.lock().await.side, PositionSide::Long);
}

#[tokio::test(start_paused = true)]
async fn superseded_monitor_never_acts_after_flip() {
    let mut fx = fixture();

    fx.engine.apply(TradeSignal::EnterLong).await;
    fx.engine.apply(TradeSignal::EnterShort).await;

    // Crosses the old long stop (95) but not the short stop (105). Only the
    // short's monitor is alive; the long's must never fire its exit.
    fx.feed.publish(dec!(94));
    tokio::time::sleep(POLL * 5).await;

    // Long entry, flip exit, short entry; nothing from the stale monitor.
    assert_eq!(fx.gateway.calls_named("market_order"), 3);
    assert_eq!(fx.position.lock().await.side, PositionSide::Short);
    assert!(fx.engine.has_monitor());
}

#[tokio::test(start_paused = true)]
async fn take_profit_fill_flattens_without_market_exit() {
    let mut fx = fixture();

    fx.engine.apply(TradeSignal::EnterLong).await;
    let tp_id = fx
        .position
        .lock()
        .await
        .take_profit_order_id
        .expect("take-profit should be resting");

    fx.gateway.fill_order(tp_id, dec!(38.000));
    tokio::time::sleep(POLL * 3).await;

    assert!(fx.position.lock().await.is_flat());
    // Only the entry; no market exit was needed.
    assert_eq!(fx.gateway.calls_named("market_order"), 1);
    assert_eq!(fx.gateway.calls_named("cancel_order"), 0);
}

#[tokio::test(start_paused = true)]
async fn partial_take_profit_does_not_flatten() {
    let mut fx = fixture();

    fx.engine.apply(TradeSignal::EnterLong).await;
    let tp_id = fx.position.lock().await.take_profit_order_id.unwrap();

    fx.gateway
        .script_order_status(tp_id, dec!(10), OrderStatus::PartiallyFilled);
    tokio::time::sleep(POLL * 3).await;

    assert_eq!(fx.position.lock().await.side, PositionSide::Long);
    assert!(fx.engine.has_monitor());
}

#[tokio::test(start_paused = true)]
async fn no_live_price_keeps_bot_flat() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_balance(dec!(1000));

    let feed = PriceFeed::new();
    let position = Arc::new(Mutex::new(Position::flat()));
    let mut engine = PositionEngine::new(
        &test_config(),
        ResilientInvoker::new(Arc::clone(&gateway)),
        feed,
        Arc::clone(&position),
    );

    engine.apply(TradeSignal::EnterLong).await;

    assert!(position.lock().await.is_flat());
    assert_eq!(gateway.calls_named("market_order"), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_balance_sizes_to_zero_and_stays_flat() {
    let mut fx = fixture();
    fx.gateway.set_balance(dec!(0));

    fx.engine.apply(TradeSignal::EnterLong).await;

    assert!(fx.position.lock().await.is_flat());
    assert_eq!(fx.gateway.calls_named("market_order"), 0);
}
