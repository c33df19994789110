//! Signal-driven leveraged futures trading bot.
//!
//! This library holds at most one directional position on a single futures
//! symbol. External signals say which position to hold; the engine converts
//! the difference between the desired and current position into exchange
//! orders, and a monitor task guards every open position with a local
//! stop-loss watch and an optional resting take-profit order.
//!
//! # Lifecycle
//!
//! ```text
//! signal ─▶ stop monitor ─▶ close current (recorded qty) ─▶ open desired
//!                                                           │
//!                                   spawn monitor ◀─────────┘
//!                                   (take-profit poll + stop-loss watch)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`gateway`]: Exchange REST gateway and the retry-forever invoker
//! - [`feed`]: Live price feed over WebSocket
//! - [`signal`]: Trade signals and the queue delivering them
//! - [`trading`]: Sizing, position state, the exit monitor, and the engine
//! - [`api`]: HTTP API for health, status, and signal injection
//! - [`metrics`]: Prometheus counters and histograms

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod metrics;
pub mod signal;
pub mod trading;

pub use config::Config;
pub use error::{BotError, Result};
