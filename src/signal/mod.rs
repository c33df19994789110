//! Trade signals and the queue that delivers them to the position engine.
//!
//! Signals arrive over the HTTP webhook and are consumed strictly in order by
//! a single engine task, so every transition sees the position state the
//! previous transition left behind.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::mpsc;

/// Depth of the signal queue. Senders are backpressured past this.
pub const SIGNAL_QUEUE_DEPTH: usize = 16;

/// A directive telling the engine what position it should be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum TradeSignal {
    /// Hold a long position.
    EnterLong,
    /// Hold a short position.
    EnterShort,
    /// Hold no position.
    Flatten,
}

/// Create the bounded FIFO signal queue.
pub fn signal_channel() -> (mpsc::Sender<TradeSignal>, mpsc::Receiver<TradeSignal>) {
    mpsc::channel(SIGNAL_QUEUE_DEPTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_from_string() {
        assert_eq!(
            TradeSignal::from_str("ENTER_LONG").unwrap(),
            TradeSignal::EnterLong
        );
        assert_eq!(
            TradeSignal::from_str("enter_short").unwrap(),
            TradeSignal::EnterShort
        );
        assert_eq!(TradeSignal::from_str("Flatten").unwrap(), TradeSignal::Flatten);
        assert!(TradeSignal::from_str("hold").is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&TradeSignal::EnterLong).unwrap();
        assert_eq!(json, "\"enter_long\"");

        let parsed: TradeSignal = serde_json::from_str("\"flatten\"").unwrap();
        assert_eq!(parsed, TradeSignal::Flatten);
    }

    #[tokio::test]
    async fn channel_preserves_order() {
        let (tx, mut rx) = signal_channel();
        tx.send(TradeSignal::EnterLong).await.unwrap();
        tx.send(TradeSignal::Flatten).await.unwrap();

        assert_eq!(rx.recv().await, Some(TradeSignal::EnterLong));
        assert_eq!(rx.recv().await, Some(TradeSignal::Flatten));
    }
}
