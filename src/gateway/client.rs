//! The exchange gateway seam.
//!
//! The trading layer never talks to the exchange directly; everything goes
//! through [`ExchangeGateway`], so tests can substitute a scripted mock and
//! the resilient invoker can drive `reconnect()` on clock-skew failures.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::GatewayError;

use super::types::{CancelAck, LimitOrderAck, MarketOrderFill, OrderUpdate, Side};

/// Operations the trading core consumes from the exchange.
///
/// Each call is an independent request/response round trip. Implementations
/// must classify the exchange's clock-skew error code as
/// [`GatewayError::ClockSkew`] so the invoker can repair it.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Current wallet balance in the quote asset (USDT).
    async fn account_balance(&self) -> Result<Decimal, GatewayError>;

    /// Set the leverage multiplier for a symbol; returns the confirmed value.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<u32, GatewayError>;

    /// Place a market order, returning the fill result.
    async fn market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<MarketOrderFill, GatewayError>;

    /// Place a resting limit order (GTC).
    async fn limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<LimitOrderAck, GatewayError>;

    /// Query an order's fill state.
    async fn order_status(&self, symbol: &str, order_id: u64) -> Result<OrderUpdate, GatewayError>;

    /// Cancel a resting order.
    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<CancelAck, GatewayError>;

    /// Re-establish the session after a clock-skew failure
    /// (fresh server-time sync).
    async fn reconnect(&self) -> Result<(), GatewayError>;
}
