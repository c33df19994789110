//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::signal::TradeSignal;
use crate::trading::Position;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the bot has finished startup and is consuming signals.
    pub ready: Arc<AtomicBool>,
    /// Traded symbol.
    pub symbol: String,
    /// Live position, shared with the engine and its monitors.
    pub position: Arc<Mutex<Position>>,
    /// Webhook side of the signal queue.
    pub signal_tx: mpsc::Sender<TradeSignal>,
}

impl AppState {
    /// Create new app state around the shared position and signal queue.
    pub fn new(
        symbol: String,
        position: Arc<Mutex<Position>>,
        signal_tx: mpsc::Sender<TradeSignal>,
    ) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            symbol,
            position,
            signal_tx,
        }
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the bot is ready to trade.
    pub ready: bool,
    /// Traded symbol.
    pub symbol: String,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Traded symbol.
    pub symbol: String,
    /// Current position.
    pub position: Position,
}

/// Incoming webhook payload.
#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    /// The requested signal.
    pub signal: TradeSignal,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct SignalResponse {
    /// Whether the signal was queued.
    pub accepted: bool,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse {
        ready: is_ready,
        symbol: state.symbol.clone(),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns the bot's current position.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let position = state.position.lock().await.clone();
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        symbol: state.symbol.clone(),
        position,
    })
}

/// Signal webhook handler - queues a signal for the engine.
///
/// Returns 202 when queued and 503 when the queue is full or the engine has
/// stopped; full means the engine is behind and the sender should retry.
pub async fn post_signal(
    State(state): State<AppState>,
    Json(request): Json<SignalRequest>,
) -> impl IntoResponse {
    match state.signal_tx.try_send(request.signal) {
        Ok(()) => {
            info!(signal = %request.signal, "Signal queued");
            (StatusCode::ACCEPTED, Json(SignalResponse { accepted: true }))
        }
        Err(e) => {
            warn!(signal = %request.signal, error = %e, "Signal rejected");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(SignalResponse { accepted: false }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::signal_channel;

    fn test_state() -> (AppState, mpsc::Receiver<TradeSignal>) {
        let (tx, rx) = signal_channel();
        let state = AppState::new(
            "ETHUSDT".to_string(),
            Arc::new(Mutex::new(Position::flat())),
            tx,
        );
        (state, rx)
    }

    #[test]
    fn app_state_ready_toggle() {
        let (state, _rx) = test_state();
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }
}
