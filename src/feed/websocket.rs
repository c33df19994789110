//! WebSocket market data feed for the traded symbol.
//!
//! Features:
//! - Automatic reconnection with exponential backoff
//! - Heartbeat/ping-pong handling
//! - Publishes miniTicker closes into the shared [`PriceFeed`]

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::FeedError;
use crate::metrics;

use super::PriceFeed;

/// A miniTicker event from the exchange stream.
///
/// Only the close price is consumed; the exchange serializes it as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct MiniTickerEvent {
    /// Event type, e.g. "24hrMiniTicker".
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    /// Close price as string.
    #[serde(rename = "c")]
    pub close: String,
}

impl MiniTickerEvent {
    /// Parse the close price to a decimal.
    pub fn close_decimal(&self) -> Option<Decimal> {
        self.close.parse().ok()
    }
}

/// Reconnection configuration for the market data stream.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial backoff delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum backoff delay in seconds.
    pub max_delay_s: u64,
    /// Backoff multiplier (e.g., 2.0 for exponential).
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_s: 30,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculate next delay with exponential backoff.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let max_delay_ms = self.max_delay_s * 1000;
        let clamped_ms = delay_ms.min(max_delay_ms as f64) as u64;
        Duration::from_millis(clamped_ms)
    }
}

/// Manages the WebSocket connection feeding [`PriceFeed`].
pub struct MarketDataFeed {
    ws_url: String,
    symbol: String,
    feed: PriceFeed,
    reconnect_config: ReconnectConfig,
}

impl MarketDataFeed {
    /// Create a new feed for a symbol.
    pub fn new(ws_url: String, symbol: String, feed: PriceFeed) -> Self {
        Self {
            ws_url,
            symbol,
            feed,
            reconnect_config: ReconnectConfig::default(),
        }
    }

    /// Create with custom reconnection config.
    pub fn with_reconnect_config(
        ws_url: String,
        symbol: String,
        feed: PriceFeed,
        config: ReconnectConfig,
    ) -> Self {
        Self {
            reconnect_config: config,
            ..Self::new(ws_url, symbol, feed)
        }
    }

    /// The stream URL for this symbol's miniTicker feed.
    fn stream_url(&self) -> String {
        format!(
            "{}/ws/{}@miniTicker",
            self.ws_url.trim_end_matches('/'),
            self.symbol.to_lowercase()
        )
    }

    /// Run one connection until it drops, publishing ticks into the feed.
    pub async fn run_once(&self) -> Result<(), FeedError> {
        let url = self.stream_url();
        info!(url = %url, "Connecting to market data stream");

        let (ws_stream, _) = connect_async(&url).await.map_err(|e| {
            FeedError::ConnectionFailed(e.to_string())
        })?;

        let (_write, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics::inc_feed_ticks();
                    self.process_message(&text);
                }
                Ok(Message::Ping(_)) => {
                    // tungstenite auto-responds to pings
                    debug!("Received ping");
                }
                Ok(Message::Close(frame)) => {
                    warn!(frame = ?frame, "Market data stream closed");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Market data stream error");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Run with automatic reconnection, forever.
    pub async fn run_with_reconnect(self: Arc<Self>) {
        let mut attempt = 0u32;

        loop {
            match self.run_once().await {
                Ok(()) => {
                    // Connection established then dropped; start backoff over.
                    attempt = 0;
                    warn!("Market data stream ended, will reconnect");
                }
                Err(e) => {
                    error!(error = %e, attempt = attempt, "Market data connection failed");
                }
            }

            let delay = self.reconnect_config.next_delay(attempt);
            metrics::inc_feed_reconnects();

            info!(delay_ms = delay.as_millis(), "Reconnecting after delay");
            tokio::time::sleep(delay).await;

            attempt = attempt.saturating_add(1);
        }
    }

    /// Parse a stream message and publish the close price.
    fn process_message(&self, text: &str) {
        let event: MiniTickerEvent = match serde_json::from_str(text) {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable stream message");
                return;
            }
        };

        match event.close_decimal() {
            Some(price) => self.feed.publish(price),
            None => warn!(close = %event.close, "Tick close price is not a decimal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn feed() -> MarketDataFeed {
        MarketDataFeed::new(
            "wss://fstream.binance.com".to_string(),
            "ETHUSDT".to_string(),
            PriceFeed::new(),
        )
    }

    #[test]
    fn stream_url_is_lowercase_mini_ticker() {
        assert_eq!(
            feed().stream_url(),
            "wss://fstream.binance.com/ws/ethusdt@miniTicker"
        );
    }

    #[test]
    fn mini_ticker_event_parses_and_publishes() {
        let f = feed();
        f.process_message(
            r#"{"e":"24hrMiniTicker","E":1694263500000,"s":"ETHUSDT","c":"1850.25","o":"1800.00","h":"1860.00","l":"1790.00","v":"10000","q":"18000000"}"#,
        );
        assert_eq!(f.feed.latest_price(), Some(dec!(1850.25)));
    }

    #[test]
    fn bad_message_leaves_feed_untouched() {
        let f = feed();
        f.process_message("not json");
        f.process_message(r#"{"e":"24hrMiniTicker","c":"oops"}"#);
        assert_eq!(f.feed.latest_price(), None);
    }

    #[test]
    fn backoff_grows_and_clamps() {
        let config = ReconnectConfig::default();
        assert_eq!(config.next_delay(0), Duration::from_secs(1));
        assert_eq!(config.next_delay(1), Duration::from_secs(2));
        assert_eq!(config.next_delay(10), Duration::from_secs(30));
    }
}
