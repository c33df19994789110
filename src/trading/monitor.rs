//! Cancellable exit monitor for an open position.
//!
//! One monitor task exists per open position. Each tick it checks, in order:
//! the stop flag, the resting take-profit order (if any), then the stop-loss
//! watch level against the live price. A stop-loss cross claims the stop flag
//! first, then cancels the take-profit order, exits at market with the
//! recorded entry quantity, and flattens the shared position.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::feed::PriceFeed;
use crate::gateway::{ExchangeGateway, OrderStatus, ResilientInvoker};
use crate::metrics;

use super::position::Position;

/// Handle to a running exit monitor.
///
/// Dropping the handle does not stop the task; callers must `stop()` it
/// before mutating the position it watches.
pub struct MonitorHandle {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Spawn a monitor over the given position.
    pub fn spawn<G>(
        invoker: ResilientInvoker<G>,
        feed: PriceFeed,
        position: Arc<Mutex<Position>>,
        symbol: String,
        poll_interval: Duration,
    ) -> Self
    where
        G: ExchangeGateway + ?Sized + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_monitor(
            Arc::clone(&stop),
            invoker,
            feed,
            position,
            symbol,
            poll_interval,
        ));

        Self { stop, task }
    }

    /// Stop the monitor. Idempotent; returns immediately.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.task.abort();
    }

    /// Whether the monitor has been told to stop or has finished on its own.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.task.is_finished()
    }
}

async fn run_monitor<G>(
    stop: Arc<AtomicBool>,
    invoker: ResilientInvoker<G>,
    feed: PriceFeed,
    position: Arc<Mutex<Position>>,
    symbol: String,
    poll_interval: Duration,
) where
    G: ExchangeGateway + ?Sized + 'static,
{
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }

        let snapshot = position.lock().await.clone();
        if snapshot.is_flat() {
            // Flattened elsewhere; nothing left to watch.
            stop.store(true, Ordering::SeqCst);
            return;
        }

        // Take-profit completion first: a filled limit exit means the
        // position is already gone on the exchange.
        if let Some(order_id) = snapshot.take_profit_order_id {
            let update = invoker
                .invoke("order_status", |g| {
                    let symbol = symbol.clone();
                    async move { g.order_status(&symbol, order_id).await }
                })
                .await;

            if stop.load(Ordering::SeqCst) {
                return;
            }

            if update.status == OrderStatus::Filled && update.executed_qty == snapshot.quantity {
                info!(
                    order_id,
                    side = %snapshot.side,
                    quantity = %snapshot.quantity,
                    price = ?snapshot.take_profit,
                    "Take-profit filled, position closed"
                );
                metrics::inc_take_profit_fills();
                metrics::inc_positions_closed("take_profit");
                stop.store(true, Ordering::SeqCst);
                *position.lock().await = Position::flat();
                return;
            }
        }

        // Stop-loss watch against the live price.
        if let Some(price) = feed.latest_price() {
            if snapshot.stop_hit(price) {
                // Claim the stop flag before touching the position so a
                // concurrent signal cannot race a second exit.
                stop.store(true, Ordering::SeqCst);

                warn!(
                    side = %snapshot.side,
                    price = %price,
                    stop_loss = %snapshot.stop_loss,
                    "Stop-loss crossed, exiting at market"
                );

                if let Some(order_id) = snapshot.take_profit_order_id {
                    invoker
                        .invoke("cancel_order", |g| {
                            let symbol = symbol.clone();
                            async move { g.cancel_order(&symbol, order_id).await }
                        })
                        .await;
                }

                let Some(exit_side) = snapshot.side.exit_order_side() else {
                    return;
                };
                let quantity = snapshot.quantity;
                let fill = invoker
                    .invoke("market_order", |g| {
                        let symbol = symbol.clone();
                        async move { g.market_order(&symbol, exit_side, quantity).await }
                    })
                    .await;

                info!(
                    order_id = fill.order_id,
                    avg_price = %fill.avg_price,
                    executed_qty = %fill.executed_qty,
                    "Stop-loss exit filled"
                );
                metrics::inc_stop_loss_exits();
                metrics::inc_positions_closed("stop_loss");
                *position.lock().await = Position::flat();
                return;
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}
