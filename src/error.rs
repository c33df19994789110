//! Unified error types for the trading bot.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the trading bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Exchange gateway error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Trade sizing error.
    #[error("sizing error: {0}")]
    Sizing(#[from] SizingError),

    /// Price feed error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exchange gateway call errors.
///
/// The resilient invoker classifies these: [`GatewayError::ClockSkew`] triggers
/// a gateway reconnect, everything else is retried after a fixed delay.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// HTTP transport failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The exchange returned an error payload.
    #[error("exchange error {code}: {message}")]
    Api {
        /// Exchange error code.
        code: i64,
        /// Human-readable message from the exchange.
        message: String,
    },

    /// Request timestamp fell outside the exchange's receive window.
    /// Repaired by re-syncing the client clock against server time.
    #[error("request timestamp outside recvWindow (clock skew)")]
    ClockSkew,

    /// A response was syntactically valid but missing an expected field.
    #[error("response missing expected field `{path}`")]
    MissingField {
        /// Dotted/indexed path that failed to resolve.
        path: String,
    },

    /// Failed to parse a response body or field value.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Exchange error code signalling a clock-skew/auth failure.
    pub const CLOCK_SKEW_CODE: i64 = -1022;

    /// Build a gateway error from an exchange error payload, mapping the
    /// clock-skew code to its dedicated variant.
    pub fn from_api(code: i64, message: impl Into<String>) -> Self {
        if code == Self::CLOCK_SKEW_CODE {
            GatewayError::ClockSkew
        } else {
            GatewayError::Api {
                code,
                message: message.into(),
            }
        }
    }

    /// Check whether this error calls for a gateway reconnect.
    pub fn is_clock_skew(&self) -> bool {
        matches!(self, GatewayError::ClockSkew)
    }
}

/// Trade sizing errors. These are precondition failures and are not retried.
#[derive(Error, Debug)]
pub enum SizingError {
    /// The price feed has not delivered a price yet.
    #[error("price feed not ready")]
    PriceUnavailable,

    /// Price must be strictly positive to size a trade.
    #[error("non-positive price: {0}")]
    NonPositivePrice(Decimal),
}

/// Price feed connection and message errors.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Connection failed.
    #[error("feed connection failed: {0}")]
    ConnectionFailed(String),

    /// Message parsing failed.
    #[error("failed to parse feed message: {0}")]
    ParseError(String),

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_skew_code_maps_to_dedicated_variant() {
        let err = GatewayError::from_api(-1022, "Timestamp for this request is outside of the recvWindow");
        assert!(err.is_clock_skew());

        let err = GatewayError::from_api(-2019, "Margin is insufficient");
        assert!(!err.is_clock_skew());
        assert!(matches!(err, GatewayError::Api { code: -2019, .. }));
    }
}
