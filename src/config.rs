//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Exchange Credentials ===
    /// Exchange API key.
    pub api_key: String,

    /// Exchange API secret (HMAC signing key).
    pub api_secret: String,

    // === Trading Parameters ===
    /// Futures symbol to trade (e.g., ETHUSDT).
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Leverage multiplier applied to the account balance.
    #[serde(default = "default_leverage")]
    pub leverage: u32,

    /// Stop-loss distance for longs, percent below entry.
    #[serde(default = "default_stop_pct")]
    pub long_stoploss_pct: Decimal,

    /// Take-profit distance for longs, percent above entry.
    /// None disables the protective order for longs.
    #[serde(default)]
    pub long_takeprofit_pct: Option<Decimal>,

    /// Stop-loss distance for shorts, percent above entry.
    #[serde(default = "default_stop_pct")]
    pub short_stoploss_pct: Decimal,

    /// Take-profit distance for shorts, percent below entry.
    /// None disables the protective order for shorts.
    #[serde(default)]
    pub short_takeprofit_pct: Option<Decimal>,

    /// Sizing safety discount (0.05 = size 5% below the maximum).
    #[serde(default = "default_safety_factor")]
    pub safety_factor: Decimal,

    /// Exit monitor poll interval in milliseconds.
    #[serde(default = "default_monitor_poll_ms")]
    pub monitor_poll_ms: u64,

    // === Exchange Endpoints ===
    /// Futures REST base URL.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    /// Futures market-data WebSocket base URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Signed-request receive window in milliseconds.
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,

    // === Server Configuration ===
    /// HTTP server port for health/status/signal endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_symbol() -> String {
    "ETHUSDT".to_string()
}

fn default_leverage() -> u32 {
    4
}

fn default_stop_pct() -> Decimal {
    Decimal::new(5, 0) // 5%
}

fn default_safety_factor() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_monitor_poll_ms() -> u64 {
    2000
}

fn default_rest_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_ws_url() -> String {
    "wss://fstream.binance.com".to_string()
}

fn default_recv_window() -> u64 {
    6000
}

fn default_port() -> u16 {
    5500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API_KEY is required".to_string());
        }

        if self.api_secret.is_empty() {
            return Err("API_SECRET is required".to_string());
        }

        if self.symbol.is_empty() {
            return Err("SYMBOL must not be empty".to_string());
        }

        if self.leverage == 0 {
            return Err("LEVERAGE must be at least 1".to_string());
        }

        if self.long_stoploss_pct <= Decimal::ZERO || self.short_stoploss_pct <= Decimal::ZERO {
            return Err("stop-loss percentages must be positive".to_string());
        }

        if self.safety_factor < Decimal::ZERO || self.safety_factor >= Decimal::ONE {
            return Err("SAFETY_FACTOR must be in [0, 1)".to_string());
        }

        if self.monitor_poll_ms == 0 {
            return Err("MONITOR_POLL_MS must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
        symbol: default_symbol(),
        leverage: default_leverage(),
        long_stoploss_pct: default_stop_pct(),
        long_takeprofit_pct: Some(Decimal::new(10, 0)),
        short_stoploss_pct: default_stop_pct(),
        short_takeprofit_pct: Some(Decimal::new(10, 0)),
        safety_factor: default_safety_factor(),
        monitor_poll_ms: default_monitor_poll_ms(),
        rest_url: default_rest_url(),
        ws_url: default_ws_url(),
        recv_window_ms: default_recv_window(),
        port: default_port(),
        rust_log: default_log_level(),
    }
}
