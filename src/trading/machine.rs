//! The position engine: one task that owns all position transitions.
//!
//! Signals are applied strictly in arrival order. Every transition follows
//! the same shape: stop the running monitor, close the current position if
//! one exists, then open the desired one. Exits always use the quantity
//! recorded at entry fill time.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::feed::PriceFeed;
use crate::gateway::{ExchangeGateway, ResilientInvoker};
use crate::metrics;
use crate::signal::TradeSignal;

use super::monitor::MonitorHandle;
use super::position::{protective_levels, Position, PositionSide};
use super::sizing::max_trade_quantity_from_feed;

/// Drives the position lifecycle from a stream of trade signals.
pub struct PositionEngine<G: ExchangeGateway + ?Sized + 'static> {
    invoker: ResilientInvoker<G>,
    feed: PriceFeed,
    position: Arc<Mutex<Position>>,
    monitor: Option<MonitorHandle>,
    symbol: String,
    leverage: u32,
    long_stop_loss_pct: Decimal,
    long_take_profit_pct: Option<Decimal>,
    short_stop_loss_pct: Decimal,
    short_take_profit_pct: Option<Decimal>,
    safety_factor: Decimal,
    poll_interval: Duration,
}

impl<G: ExchangeGateway + ?Sized + 'static> PositionEngine<G> {
    /// Build an engine from configuration.
    ///
    /// `position` is shared with the HTTP status endpoint; the engine and its
    /// monitors are the only writers.
    pub fn new(
        config: &Config,
        invoker: ResilientInvoker<G>,
        feed: PriceFeed,
        position: Arc<Mutex<Position>>,
    ) -> Self {
        Self {
            invoker,
            feed,
            position,
            monitor: None,
            symbol: config.symbol.clone(),
            leverage: config.leverage,
            long_stop_loss_pct: config.long_stoploss_pct,
            long_take_profit_pct: config.long_takeprofit_pct,
            short_stop_loss_pct: config.short_stoploss_pct,
            short_take_profit_pct: config.short_takeprofit_pct,
            safety_factor: config.safety_factor,
            poll_interval: Duration::from_millis(config.monitor_poll_ms),
        }
    }

    /// One-time startup: wait for the first price tick, log the wallet
    /// balance, and apply the configured leverage.
    pub async fn startup(&self) {
        info!(symbol = %self.symbol, "Waiting for first price tick");
        self.feed.wait_until_ready().await;

        let balance = self
            .invoker
            .invoke("account_balance", |g| async move {
                g.account_balance().await
            })
            .await;
        info!(balance = %balance, "Wallet balance");

        let symbol = self.symbol.clone();
        let leverage = self.leverage;
        let confirmed = self
            .invoker
            .invoke("set_leverage", |g| {
                let symbol = symbol.clone();
                async move { g.set_leverage(&symbol, leverage).await }
            })
            .await;
        info!(leverage = confirmed, "Leverage applied");

        let price = self.feed.latest_price();
        match max_trade_quantity_from_feed(balance, self.leverage, price, self.safety_factor) {
            Ok(qty) => info!(price = ?price, max_quantity = %qty, "Current max trade size"),
            Err(e) => warn!(error = %e, "Could not size a trade at startup"),
        }
    }

    /// Consume signals until the channel closes.
    pub async fn run(mut self, mut signals: mpsc::Receiver<TradeSignal>) {
        while let Some(signal) = signals.recv().await {
            metrics::inc_signals_received(&signal.to_string());
            self.apply(signal).await;
        }
        info!("Signal channel closed, stopping engine");
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
    }

    /// Apply one signal to the current position.
    #[instrument(skip(self), fields(symbol = %self.symbol))]
    pub async fn apply(&mut self, signal: TradeSignal) {
        let desired = match signal {
            TradeSignal::EnterLong => PositionSide::Long,
            TradeSignal::EnterShort => PositionSide::Short,
            TradeSignal::Flatten => PositionSide::Flat,
        };

        let current = self.position.lock().await.side;
        if current == desired {
            debug!(side = %current, "Already in desired position, ignoring signal");
            metrics::inc_signals_ignored(&signal.to_string());
            return;
        }

        // Stop the monitor before touching the position so no concurrent
        // exit can fire mid-transition.
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }

        // Re-read: the monitor may have flattened the position between the
        // no-op check and the stop.
        let snapshot = self.position.lock().await.clone();
        if !snapshot.is_flat() {
            self.close_position(&snapshot, "signal").await;
            *self.position.lock().await = Position::flat();
        }

        if desired != PositionSide::Flat {
            self.open_position(desired).await;
        }
    }

    /// Close the given position: cancel its resting take-profit, then exit
    /// at market with the recorded entry quantity.
    async fn close_position(&self, snapshot: &Position, reason: &str) {
        if let Some(order_id) = snapshot.take_profit_order_id {
            let symbol = self.symbol.clone();
            self.invoker
                .invoke("cancel_order", |g| {
                    let symbol = symbol.clone();
                    async move { g.cancel_order(&symbol, order_id).await }
                })
                .await;
        }

        let Some(exit_side) = snapshot.side.exit_order_side() else {
            return;
        };
        let symbol = self.symbol.clone();
        let quantity = snapshot.quantity;
        let fill = self
            .invoker
            .invoke("market_order", |g| {
                let symbol = symbol.clone();
                async move { g.market_order(&symbol, exit_side, quantity).await }
            })
            .await;

        info!(
            side = %snapshot.side,
            avg_price = %fill.avg_price,
            executed_qty = %fill.executed_qty,
            reason,
            "Position closed"
        );
        metrics::inc_positions_closed(reason);
    }

    /// Open a position in the desired direction, place its protective
    /// take-profit, and start a monitor over it.
    async fn open_position(&mut self, desired: PositionSide) {
        let Some(entry_side) = desired.entry_order_side() else {
            return;
        };

        let price = self.feed.latest_price();
        let balance = self
            .invoker
            .invoke("account_balance", |g| async move {
                g.account_balance().await
            })
            .await;

        let quantity =
            match max_trade_quantity_from_feed(balance, self.leverage, price, self.safety_factor) {
                Ok(qty) if qty > Decimal::ZERO => qty,
                Ok(_) => {
                    warn!(balance = %balance, price = ?price, "Sized to zero, staying flat");
                    return;
                }
                Err(e) => {
                    error!(error = %e, side = %desired, "Sizing failed, staying flat");
                    return;
                }
            };

        let symbol = self.symbol.clone();
        let fill = self
            .invoker
            .invoke("market_order", |g| {
                let symbol = symbol.clone();
                async move { g.market_order(&symbol, entry_side, quantity).await }
            })
            .await;

        info!(
            side = %desired,
            avg_price = %fill.avg_price,
            executed_qty = %fill.executed_qty,
            "Position opened"
        );
        metrics::inc_positions_opened(&desired.to_string());

        let (stop_pct, tp_pct) = match desired {
            PositionSide::Long => (self.long_stop_loss_pct, self.long_take_profit_pct),
            PositionSide::Short => (self.short_stop_loss_pct, self.short_take_profit_pct),
            PositionSide::Flat => unreachable!("open_position is never called for Flat"),
        };
        let levels = protective_levels(desired, fill.avg_price, stop_pct, tp_pct);

        let take_profit_order_id = match levels.take_profit {
            Some(tp_price) => {
                let symbol = self.symbol.clone();
                let exit_side = entry_side.opposite();
                let exit_qty = fill.executed_qty;
                let ack = self
                    .invoker
                    .invoke("limit_order", |g| {
                        let symbol = symbol.clone();
                        async move { g.limit_order(&symbol, exit_side, exit_qty, tp_price).await }
                    })
                    .await;
                info!(order_id = ack.order_id, price = %tp_price, "Take-profit placed");
                Some(ack.order_id)
            }
            None => None,
        };

        *self.position.lock().await = Position {
            side: desired,
            entry_price: fill.avg_price,
            quantity: fill.executed_qty,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            take_profit_order_id,
        };

        self.monitor = Some(MonitorHandle::spawn(
            self.invoker.clone(),
            self.feed.clone(),
            Arc::clone(&self.position),
            self.symbol.clone(),
            self.poll_interval,
        ));
    }

    /// The shared position cell.
    pub fn position(&self) -> &Arc<Mutex<Position>> {
        &self.position
    }

    /// Whether a monitor is currently attached.
    pub fn has_monitor(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| !m.is_stopped())
    }
}
