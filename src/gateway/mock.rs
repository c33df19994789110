//! Mock exchange gateway for unit and integration testing.
//!
//! Records every call, fills market orders at a scripted price, tracks
//! resting limit orders so status/cancel round trips behave like the real
//! exchange, and injects failures (transient, clock-skew, missing-field)
//! without any network access.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::GatewayError;

use super::client::ExchangeGateway;
use super::types::{CancelAck, LimitOrderAck, MarketOrderFill, OrderStatus, OrderUpdate, Side};

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    /// Balance query.
    Balance,
    /// Leverage change.
    SetLeverage {
        /// Symbol.
        symbol: String,
        /// Requested multiplier.
        leverage: u32,
    },
    /// Market order placement.
    MarketOrder {
        /// Symbol.
        symbol: String,
        /// Order side.
        side: Side,
        /// Requested quantity.
        quantity: Decimal,
    },
    /// Limit order placement.
    LimitOrder {
        /// Symbol.
        symbol: String,
        /// Order side.
        side: Side,
        /// Requested quantity.
        quantity: Decimal,
        /// Limit price.
        price: Decimal,
    },
    /// Order status query.
    OrderStatus {
        /// Symbol.
        symbol: String,
        /// Order ID.
        order_id: u64,
    },
    /// Order cancellation.
    CancelOrder {
        /// Symbol.
        symbol: String,
        /// Order ID.
        order_id: u64,
    },
}

impl GatewayCall {
    /// Short name for call-count assertions.
    pub fn name(&self) -> &'static str {
        match self {
            GatewayCall::Balance => "account_balance",
            GatewayCall::SetLeverage { .. } => "set_leverage",
            GatewayCall::MarketOrder { .. } => "market_order",
            GatewayCall::LimitOrder { .. } => "limit_order",
            GatewayCall::OrderStatus { .. } => "order_status",
            GatewayCall::CancelOrder { .. } => "cancel_order",
        }
    }
}

#[derive(Debug)]
struct MockState {
    balance: Decimal,
    fill_price: Decimal,
    fill_qty_override: Option<Decimal>,
    next_order_id: u64,
    fail_balance: u32,
    clock_skew_balance: bool,
    fail_market_orders: u32,
    fail_order_status_missing: u32,
    orders: HashMap<u64, OrderUpdate>,
    calls: Vec<GatewayCall>,
    reconnects: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            balance: Decimal::ZERO,
            fill_price: Decimal::new(100, 0),
            fill_qty_override: None,
            next_order_id: 1,
            fail_balance: 0,
            clock_skew_balance: false,
            fail_market_orders: 0,
            fail_order_status_missing: 0,
            orders: HashMap::new(),
            calls: Vec::new(),
            reconnects: 0,
        }
    }
}

/// Scripted in-memory exchange gateway.
#[derive(Debug, Default)]
pub struct MockGateway {
    inner: Mutex<MockState>,
}

impl MockGateway {
    /// Create a mock gateway with default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the balance returned by `account_balance`.
    pub fn set_balance(&self, balance: Decimal) {
        self.inner.lock().unwrap().balance = balance;
    }

    /// Set the price market orders fill at.
    pub fn set_fill_price(&self, price: Decimal) {
        self.inner.lock().unwrap().fill_price = price;
    }

    /// Script the next market fill: price and executed quantity.
    pub fn script_market_fill(&self, avg_price: Decimal, executed_qty: Decimal) {
        let mut state = self.inner.lock().unwrap();
        state.fill_price = avg_price;
        state.fill_qty_override = Some(executed_qty);
    }

    /// Fail the next `n` balance calls with a transient API error.
    pub fn fail_next_balance_calls(&self, n: u32) {
        self.inner.lock().unwrap().fail_balance = n;
    }

    /// Fail the next balance call with the clock-skew error code.
    pub fn fail_next_balance_with_clock_skew(&self) {
        self.inner.lock().unwrap().clock_skew_balance = true;
    }

    /// Fail the next `n` market orders with a transient API error.
    pub fn fail_next_market_orders(&self, n: u32) {
        self.inner.lock().unwrap().fail_market_orders = n;
    }

    /// Fail the next `n` order-status calls with a missing-field error.
    pub fn fail_next_order_status_with_missing_field(&self, n: u32) {
        self.inner.lock().unwrap().fail_order_status_missing = n;
    }

    /// Script an order's status response directly.
    pub fn script_order_status(&self, order_id: u64, executed_qty: Decimal, status: OrderStatus) {
        self.inner.lock().unwrap().orders.insert(
            order_id,
            OrderUpdate {
                order_id,
                executed_qty,
                status,
            },
        );
    }

    /// Mark a resting order as fully filled at the given quantity.
    pub fn fill_order(&self, order_id: u64, executed_qty: Decimal) {
        self.script_order_status(order_id, executed_qty, OrderStatus::Filled);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls with the given name.
    pub fn calls_named(&self, name: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.name() == name)
            .count()
    }

    /// Recorded market orders as (symbol, side, quantity).
    pub fn market_orders(&self) -> Vec<(String, Side, Decimal)> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|c| match c {
                GatewayCall::MarketOrder {
                    symbol,
                    side,
                    quantity,
                } => Some((symbol.clone(), *side, *quantity)),
                _ => None,
            })
            .collect()
    }

    /// Recorded limit orders as (symbol, side, quantity, price).
    pub fn limit_orders(&self) -> Vec<(String, Side, Decimal, Decimal)> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|c| match c {
                GatewayCall::LimitOrder {
                    symbol,
                    side,
                    quantity,
                    price,
                } => Some((symbol.clone(), *side, *quantity, *price)),
                _ => None,
            })
            .collect()
    }

    /// The order ID most recently assigned to a placed order.
    pub fn last_order_id(&self) -> u64 {
        self.inner.lock().unwrap().next_order_id - 1
    }

    /// Number of reconnects performed.
    pub fn reconnect_count(&self) -> u32 {
        self.inner.lock().unwrap().reconnects
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn account_balance(&self) -> Result<Decimal, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(GatewayCall::Balance);

        if state.clock_skew_balance {
            state.clock_skew_balance = false;
            return Err(GatewayError::ClockSkew);
        }
        if state.fail_balance > 0 {
            state.fail_balance -= 1;
            return Err(GatewayError::Api {
                code: -1001,
                message: "mock balance failure".to_string(),
            });
        }

        Ok(state.balance)
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<u32, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(GatewayCall::SetLeverage {
            symbol: symbol.to_string(),
            leverage,
        });
        Ok(leverage)
    }

    async fn market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<MarketOrderFill, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(GatewayCall::MarketOrder {
            symbol: symbol.to_string(),
            side,
            quantity,
        });

        if state.fail_market_orders > 0 {
            state.fail_market_orders -= 1;
            return Err(GatewayError::Api {
                code: -1001,
                message: "mock market order failure".to_string(),
            });
        }

        let order_id = state.next_order_id;
        state.next_order_id += 1;
        let executed_qty = state.fill_qty_override.take().unwrap_or(quantity);

        state.orders.insert(
            order_id,
            OrderUpdate {
                order_id,
                executed_qty,
                status: OrderStatus::Filled,
            },
        );

        Ok(MarketOrderFill {
            order_id,
            symbol: symbol.to_string(),
            avg_price: state.fill_price,
            executed_qty,
            status: OrderStatus::Filled,
        })
    }

    async fn limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<LimitOrderAck, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(GatewayCall::LimitOrder {
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
        });

        let order_id = state.next_order_id;
        state.next_order_id += 1;

        // Rests on the book unfilled until a test scripts otherwise.
        state.orders.insert(
            order_id,
            OrderUpdate {
                order_id,
                executed_qty: Decimal::ZERO,
                status: OrderStatus::New,
            },
        );

        Ok(LimitOrderAck {
            order_id,
            symbol: symbol.to_string(),
            price,
            status: OrderStatus::New,
        })
    }

    async fn order_status(&self, symbol: &str, order_id: u64) -> Result<OrderUpdate, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(GatewayCall::OrderStatus {
            symbol: symbol.to_string(),
            order_id,
        });

        if state.fail_order_status_missing > 0 {
            state.fail_order_status_missing -= 1;
            return Err(GatewayError::MissingField {
                path: "executedQty".to_string(),
            });
        }

        state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(GatewayError::Api {
                code: -2013,
                message: "Order does not exist.".to_string(),
            })
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<CancelAck, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(GatewayCall::CancelOrder {
            symbol: symbol.to_string(),
            order_id,
        });

        if let Some(order) = state.orders.get_mut(&order_id) {
            if !order.status.is_terminal() {
                order.status = OrderStatus::Canceled;
            }
        }

        Ok(CancelAck {
            order_id,
            status: OrderStatus::Canceled,
        })
    }

    async fn reconnect(&self) -> Result<(), GatewayError> {
        self.inner.lock().unwrap().reconnects += 1;
        Ok(())
    }
}
