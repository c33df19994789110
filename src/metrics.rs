//! Prometheus metrics for the trading loop.
//!
//! This module provides counters and histograms for:
//! - Signals received and positions opened/closed
//! - Gateway retries and clock-skew reconnects
//! - Stop-loss and take-profit outcomes
//! - Gateway request latency

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Signals received counter metric name.
pub const METRIC_SIGNALS_RECEIVED: &str = "signals_received_total";
/// Signals ignored (no-op transitions) counter metric name.
pub const METRIC_SIGNALS_IGNORED: &str = "signals_ignored_total";
/// Positions opened counter metric name.
pub const METRIC_POSITIONS_OPENED: &str = "positions_opened_total";
/// Positions closed counter metric name.
pub const METRIC_POSITIONS_CLOSED: &str = "positions_closed_total";
/// Stop-loss exits counter metric name.
pub const METRIC_STOP_LOSS_EXITS: &str = "stop_loss_exits_total";
/// Take-profit fills counter metric name.
pub const METRIC_TAKE_PROFIT_FILLS: &str = "take_profit_fills_total";
/// Invoker retries counter metric name.
pub const METRIC_INVOKER_RETRIES: &str = "invoker_retries_total";
/// Gateway clock-skew reconnects counter metric name.
pub const METRIC_GATEWAY_RECONNECTS: &str = "gateway_reconnects_total";
/// Price feed reconnects counter metric name.
pub const METRIC_FEED_RECONNECTS: &str = "feed_reconnects_total";
/// Price feed ticks counter metric name.
pub const METRIC_FEED_TICKS: &str = "feed_ticks_total";
/// Gateway request latency metric name.
pub const METRIC_GATEWAY_REQUEST_LATENCY: &str = "gateway_request_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(
        METRIC_SIGNALS_RECEIVED,
        "Total number of trade signals received"
    );
    describe_counter!(
        METRIC_SIGNALS_IGNORED,
        "Total number of trade signals ignored as no-ops"
    );
    describe_counter!(METRIC_POSITIONS_OPENED, "Total number of positions opened");
    describe_counter!(METRIC_POSITIONS_CLOSED, "Total number of positions closed");
    describe_counter!(
        METRIC_STOP_LOSS_EXITS,
        "Total number of stop-loss market exits"
    );
    describe_counter!(
        METRIC_TAKE_PROFIT_FILLS,
        "Total number of take-profit limit order fills"
    );
    describe_counter!(
        METRIC_INVOKER_RETRIES,
        "Total number of retried gateway calls"
    );
    describe_counter!(
        METRIC_GATEWAY_RECONNECTS,
        "Total number of gateway reconnects after clock skew"
    );
    describe_counter!(
        METRIC_FEED_RECONNECTS,
        "Total number of price feed reconnections"
    );
    describe_counter!(METRIC_FEED_TICKS, "Total number of price ticks received");
    describe_histogram!(
        METRIC_GATEWAY_REQUEST_LATENCY,
        "Gateway request latency in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Increment signals received counter.
pub fn inc_signals_received(signal: &str) {
    counter!(METRIC_SIGNALS_RECEIVED, "signal" => signal.to_string()).increment(1);
}

/// Increment signals ignored counter.
pub fn inc_signals_ignored(signal: &str) {
    counter!(METRIC_SIGNALS_IGNORED, "signal" => signal.to_string()).increment(1);
}

/// Increment positions opened counter.
pub fn inc_positions_opened(side: &str) {
    counter!(METRIC_POSITIONS_OPENED, "side" => side.to_string()).increment(1);
}

/// Increment positions closed counter.
pub fn inc_positions_closed(reason: &str) {
    counter!(METRIC_POSITIONS_CLOSED, "reason" => reason.to_string()).increment(1);
}

/// Increment stop-loss exits counter.
pub fn inc_stop_loss_exits() {
    counter!(METRIC_STOP_LOSS_EXITS).increment(1);
}

/// Increment take-profit fills counter.
pub fn inc_take_profit_fills() {
    counter!(METRIC_TAKE_PROFIT_FILLS).increment(1);
}

/// Increment invoker retries counter.
pub fn inc_invoker_retries(op: &'static str) {
    counter!(METRIC_INVOKER_RETRIES, "op" => op).increment(1);
}

/// Increment gateway reconnects counter.
pub fn inc_gateway_reconnects() {
    counter!(METRIC_GATEWAY_RECONNECTS).increment(1);
}

/// Increment price feed reconnects counter.
pub fn inc_feed_reconnects() {
    counter!(METRIC_FEED_RECONNECTS).increment(1);
}

/// Increment price feed ticks counter.
pub fn inc_feed_ticks() {
    counter!(METRIC_FEED_TICKS).increment(1);
}

/// Record gateway request latency.
pub fn record_gateway_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_GATEWAY_REQUEST_LATENCY, "endpoint" => endpoint.to_string())
        .record(latency_ms);
}
