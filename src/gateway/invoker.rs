//! Retry-forever wrapper around exchange gateway calls.
//!
//! A stuck or silently-failing call could leave a position with no stop-loss
//! enforcement, so the invoker never gives up: transient failures (transport
//! errors, exchange error payloads, missing response fields) are retried on a
//! fixed delay until the call succeeds. Callers that need bounded latency must
//! wrap it with their own timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::GatewayError;
use crate::metrics;

use super::client::ExchangeGateway;

/// Fixed delay between retries of a failed gateway call.
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Retries gateway operations until they succeed and repairs clock-skew
/// failures by reconnecting the gateway.
pub struct ResilientInvoker<G: ExchangeGateway + ?Sized> {
    gateway: Arc<G>,
    retry_delay: Duration,
}

impl<G: ExchangeGateway + ?Sized> Clone for ResilientInvoker<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            retry_delay: self.retry_delay,
        }
    }
}

impl<G: ExchangeGateway + ?Sized> ResilientInvoker<G> {
    /// Create an invoker over the given gateway with the standard delay.
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Override the retry delay (used by tests).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// The wrapped gateway.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Call `op` against the gateway until it succeeds.
    ///
    /// A clock-skew failure reconnects the gateway and retries immediately;
    /// it does not count as a normal failure. Every other failure is logged
    /// with the operation name and retried after the fixed delay.
    pub async fn invoke<T, F, Fut>(&self, op_name: &'static str, mut op: F) -> T
    where
        F: FnMut(Arc<G>) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        loop {
            match op(Arc::clone(&self.gateway)).await {
                Ok(value) => return value,
                Err(err) if err.is_clock_skew() => {
                    warn!(op = op_name, "clock skew detected, reconnecting gateway");
                    metrics::inc_gateway_reconnects();
                    if let Err(reconnect_err) = self.gateway.reconnect().await {
                        warn!(
                            op = op_name,
                            error = %reconnect_err,
                            "gateway reconnect failed, retrying in {}s",
                            self.retry_delay.as_secs()
                        );
                        metrics::inc_invoker_retries(op_name);
                        sleep(self.retry_delay).await;
                    }
                }
                Err(err) => {
                    warn!(
                        op = op_name,
                        error = %err,
                        "gateway call failed, retrying in {}s",
                        self.retry_delay.as_secs()
                    );
                    metrics::inc_invoker_retries(op_name);
                    sleep(self.retry_delay).await;
                }
            }
        }
    }
}
