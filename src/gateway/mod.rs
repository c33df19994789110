//! Exchange connectivity: REST gateway, response field extraction, and the
//! retry-forever invoker the trading core calls through.

pub mod binance;
pub mod client;
pub mod fields;
pub mod invoker;
pub mod mock;
pub mod types;

pub use binance::BinanceFuturesGateway;
pub use client::ExchangeGateway;
pub use fields::FieldPath;
pub use invoker::{ResilientInvoker, RETRY_DELAY};
pub use types::{CancelAck, LimitOrderAck, MarketOrderFill, OrderStatus, OrderUpdate, Side};
