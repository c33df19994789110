//! Live mark price for the traded symbol.
//!
//! The WebSocket task writes ticks into a [`PriceFeed`]; the sizer and the
//! exit monitor read the latest price without blocking on the stream.

pub mod websocket;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rust_decimal::Decimal;

pub use websocket::{MarketDataFeed, ReconnectConfig};

/// Shared last-known price for the traded symbol.
///
/// `latest_price` is `None` until the first tick arrives; readers must treat
/// that as "price unavailable", not zero.
#[derive(Debug, Clone, Default)]
pub struct PriceFeed {
    latest: Arc<RwLock<Option<Decimal>>>,
    ready: Arc<AtomicBool>,
}

impl PriceFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest observed price, if any tick has arrived.
    pub fn latest_price(&self) -> Option<Decimal> {
        *self.latest.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether at least one tick has arrived.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Record a new tick.
    pub fn publish(&self, price: Decimal) {
        *self.latest.write().unwrap_or_else(|e| e.into_inner()) = Some(price);
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Wait until the first tick arrives.
    pub async fn wait_until_ready(&self) {
        while !self.is_ready() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
