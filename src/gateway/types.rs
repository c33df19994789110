//! Order types shared across the gateway and trading layers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    #[strum(serialize = "BUY", serialize = "buy")]
    Buy,
    /// Sell order.
    #[strum(serialize = "SELL", serialize = "sell")]
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order status reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order accepted, resting on the book.
    #[strum(serialize = "NEW", serialize = "new")]
    New,
    /// Order partially filled.
    #[strum(serialize = "PARTIALLY_FILLED", serialize = "partially_filled")]
    PartiallyFilled,
    /// Order fully filled.
    #[strum(serialize = "FILLED", serialize = "filled")]
    Filled,
    /// Order was canceled.
    #[strum(serialize = "CANCELED", serialize = "CANCELLED", serialize = "canceled")]
    Canceled,
    /// Order was rejected.
    #[strum(serialize = "REJECTED", serialize = "rejected")]
    Rejected,
    /// Order expired.
    #[strum(serialize = "EXPIRED", serialize = "expired")]
    Expired,
}

impl OrderStatus {
    /// Check if status is terminal (won't change).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

/// Result of a market order executed with full-result response semantics.
#[derive(Debug, Clone)]
pub struct MarketOrderFill {
    /// Exchange-assigned order ID.
    pub order_id: u64,
    /// Symbol the order was placed on.
    pub symbol: String,
    /// Average fill price.
    pub avg_price: Decimal,
    /// Quantity actually executed.
    pub executed_qty: Decimal,
    /// Status reported by the exchange.
    pub status: OrderStatus,
}

/// Acknowledgement of a resting limit order.
#[derive(Debug, Clone)]
pub struct LimitOrderAck {
    /// Exchange-assigned order ID.
    pub order_id: u64,
    /// Symbol the order was placed on.
    pub symbol: String,
    /// Limit price.
    pub price: Decimal,
    /// Status reported by the exchange.
    pub status: OrderStatus,
}

/// Point-in-time snapshot of an order's fill state.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    /// Exchange-assigned order ID.
    pub order_id: u64,
    /// Quantity executed so far.
    pub executed_qty: Decimal,
    /// Status reported by the exchange.
    pub status: OrderStatus,
}

/// Acknowledgement of an order cancellation.
#[derive(Debug, Clone)]
pub struct CancelAck {
    /// Exchange-assigned order ID.
    pub order_id: u64,
    /// Status after cancellation.
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn order_status_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }

    #[test]
    fn order_status_from_string() {
        assert_eq!(OrderStatus::from_str("FILLED").unwrap(), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_str("CANCELLED").unwrap(), OrderStatus::Canceled);
        assert_eq!(OrderStatus::from_str("new").unwrap(), OrderStatus::New);
    }
}
