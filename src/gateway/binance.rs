//! Signed REST client for the Binance USD-M futures API.

use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::fields::FieldPath;
use crate::metrics;

use super::client::ExchangeGateway;
use super::types::{CancelAck, LimitOrderAck, MarketOrderFill, OrderStatus, OrderUpdate, Side};

type HmacSha256 = Hmac<Sha256>;

/// Binance USD-M futures REST gateway with HMAC-SHA256 request signing.
///
/// Keeps a server-time offset that [`ExchangeGateway::reconnect`] refreshes;
/// signed requests stamp `local_now + offset` so a repaired clock skew sticks.
pub struct BinanceFuturesGateway {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Futures REST base URL.
    rest_url: String,
    /// API key sent in the `X-MBX-APIKEY` header.
    api_key: String,
    /// HMAC signing secret.
    api_secret: String,
    /// Signed-request receive window in milliseconds.
    recv_window_ms: u64,
    /// Server-minus-local clock offset in milliseconds.
    time_offset_ms: AtomicI64,
}

impl BinanceFuturesGateway {
    /// Create a new gateway from config with tuned HTTP settings.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_millis(2000))
            .tcp_nodelay(true)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            rest_url: config.rest_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            recv_window_ms: config.recv_window_ms,
            time_offset_ms: AtomicI64::new(0),
        }
    }

    /// Current server-adjusted timestamp in milliseconds.
    fn timestamp_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() + self.time_offset_ms.load(Ordering::SeqCst)
    }

    /// Sign a canonical query string with the API secret.
    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build the signed query string: params + timestamp + recvWindow + signature.
    fn signed_query(&self, params: &[(&str, String)]) -> String {
        let mut query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={}&timestamp={}",
            self.recv_window_ms,
            self.timestamp_ms()
        ));

        let signature = self.sign(&query);
        format!("{query}&signature={signature}")
    }

    /// Send a signed request and parse the JSON body, surfacing exchange
    /// error payloads as typed gateway errors.
    async fn signed_request(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, GatewayError> {
        let url = format!("{}{}?{}", self.rest_url, path, self.signed_query(params));

        let start = std::time::Instant::now();
        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(format!("invalid JSON body: {e}")))?;
        metrics::record_gateway_latency(start, path);

        check_exchange_error(&body)?;
        Ok(body)
    }
}

/// Map an exchange error payload (`{"code": -1022, "msg": ...}`) to a typed error.
fn check_exchange_error(body: &Value) -> Result<(), GatewayError> {
    if let Some(code) = body.get("code").and_then(Value::as_i64) {
        if code < 0 {
            let message = body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown exchange error");
            return Err(GatewayError::from_api(code, message));
        }
    }
    Ok(())
}

/// Parse an order status field, defaulting unparseable values to an error.
fn parse_status(body: &Value) -> Result<OrderStatus, GatewayError> {
    let raw = FieldPath::new("status").extract(body)?;
    let text = raw
        .as_str()
        .ok_or_else(|| GatewayError::Parse(format!("status is not a string: {raw}")))?;
    OrderStatus::from_str(text).map_err(|_| GatewayError::Parse(format!("unknown order status `{text}`")))
}

/// Parse a market order RESULT response into a fill.
fn parse_market_fill(body: &Value) -> Result<MarketOrderFill, GatewayError> {
    Ok(MarketOrderFill {
        order_id: FieldPath::new("orderId")
            .extract(body)?
            .as_u64()
            .ok_or_else(|| GatewayError::Parse("orderId is not an integer".to_string()))?,
        symbol: FieldPath::new("symbol")
            .extract(body)?
            .as_str()
            .unwrap_or_default()
            .to_string(),
        avg_price: FieldPath::new("avgPrice").extract_decimal(body)?,
        executed_qty: FieldPath::new("executedQty").extract_decimal(body)?,
        status: parse_status(body)?,
    })
}

#[async_trait]
impl ExchangeGateway for BinanceFuturesGateway {
    #[instrument(skip(self))]
    async fn account_balance(&self) -> Result<Decimal, GatewayError> {
        let body = self
            .signed_request(reqwest::Method::GET, "/fapi/v2/account", &[])
            .await?;

        // Quote-asset wallet balance lives at a fixed position in the
        // account response.
        let balance = FieldPath::new("assets[0].walletBalance").extract_decimal(&body)?;
        debug!(balance = %balance, "retrieved wallet balance");
        Ok(balance)
    }

    #[instrument(skip(self))]
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<u32, GatewayError> {
        let body = self
            .signed_request(
                reqwest::Method::POST,
                "/fapi/v1/leverage",
                &[
                    ("symbol", symbol.to_string()),
                    ("leverage", leverage.to_string()),
                ],
            )
            .await?;

        let confirmed = FieldPath::new("leverage")
            .extract(&body)?
            .as_u64()
            .ok_or_else(|| GatewayError::Parse("leverage is not an integer".to_string()))?;
        Ok(confirmed as u32)
    }

    #[instrument(skip(self), fields(symbol = %symbol, side = %side, qty = %quantity))]
    async fn market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
    ) -> Result<MarketOrderFill, GatewayError> {
        let body = self
            .signed_request(
                reqwest::Method::POST,
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("side", side.to_string()),
                    ("type", "MARKET".to_string()),
                    ("quantity", quantity.to_string()),
                    // RESULT responses include avgPrice/executedQty, so no
                    // follow-up status query is needed to record the entry.
                    ("newOrderRespType", "RESULT".to_string()),
                ],
            )
            .await?;

        parse_market_fill(&body)
    }

    #[instrument(skip(self), fields(symbol = %symbol, side = %side, qty = %quantity, price = %price))]
    async fn limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<LimitOrderAck, GatewayError> {
        let body = self
            .signed_request(
                reqwest::Method::POST,
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("side", side.to_string()),
                    ("type", "LIMIT".to_string()),
                    ("timeInForce", "GTC".to_string()),
                    ("quantity", quantity.to_string()),
                    ("price", price.to_string()),
                ],
            )
            .await?;

        Ok(LimitOrderAck {
            order_id: FieldPath::new("orderId")
                .extract(&body)?
                .as_u64()
                .ok_or_else(|| GatewayError::Parse("orderId is not an integer".to_string()))?,
            symbol: symbol.to_string(),
            price: FieldPath::new("price").extract_decimal(&body)?,
            status: parse_status(&body)?,
        })
    }

    #[instrument(skip(self), fields(symbol = %symbol, order_id = order_id))]
    async fn order_status(&self, symbol: &str, order_id: u64) -> Result<OrderUpdate, GatewayError> {
        let body = self
            .signed_request(
                reqwest::Method::GET,
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;

        Ok(OrderUpdate {
            order_id,
            executed_qty: FieldPath::new("executedQty").extract_decimal(&body)?,
            status: parse_status(&body)?,
        })
    }

    #[instrument(skip(self), fields(symbol = %symbol, order_id = order_id))]
    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<CancelAck, GatewayError> {
        let body = self
            .signed_request(
                reqwest::Method::DELETE,
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;

        Ok(CancelAck {
            order_id,
            status: parse_status(&body)?,
        })
    }

    /// Refresh the server-time offset. Unsigned endpoint, so this works even
    /// while the local clock is too far off to sign requests.
    #[instrument(skip(self))]
    async fn reconnect(&self) -> Result<(), GatewayError> {
        let url = format!("{}/fapi/v1/time", self.rest_url);
        let body: Value = self
            .http
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Parse(format!("invalid JSON body: {e}")))?;

        let server_time = FieldPath::new("serverTime")
            .extract(&body)?
            .as_i64()
            .ok_or_else(|| GatewayError::Parse("serverTime is not an integer".to_string()))?;

        let offset = server_time - chrono::Utc::now().timestamp_millis();
        self.time_offset_ms.store(offset, Ordering::SeqCst);

        info!(offset_ms = offset, "re-synced clock against server time");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn hmac_signature_matches_known_vector() {
        let mut config = test_config();
        config.api_secret =
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".to_string();
        let gateway = BinanceFuturesGateway::new(&config);

        // Reference vector from the exchange API documentation.
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            gateway.sign(query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn exchange_error_payload_is_typed() {
        let body = json!({ "code": -1022, "msg": "Signature for this request is not valid." });
        let err = check_exchange_error(&body).unwrap_err();
        assert!(err.is_clock_skew());

        let body = json!({ "code": -2019, "msg": "Margin is insufficient." });
        assert!(matches!(
            check_exchange_error(&body),
            Err(GatewayError::Api { code: -2019, .. })
        ));

        let body = json!({ "orderId": 12345, "status": "NEW" });
        assert!(check_exchange_error(&body).is_ok());
    }

    #[test]
    fn market_fill_parses_result_response() {
        let body = json!({
            "orderId": 4_611_875_134u64,
            "symbol": "ETHUSDT",
            "status": "FILLED",
            "avgPrice": "1843.20",
            "executedQty": "38.000",
            "origQty": "38.000"
        });

        let fill = parse_market_fill(&body).unwrap();
        assert_eq!(fill.order_id, 4_611_875_134);
        assert_eq!(fill.symbol, "ETHUSDT");
        assert_eq!(fill.avg_price, dec!(1843.20));
        assert_eq!(fill.executed_qty, dec!(38.000));
        assert_eq!(fill.status, OrderStatus::Filled);
    }

    #[test]
    fn market_fill_missing_field_is_gateway_error() {
        let body = json!({ "orderId": 1, "symbol": "ETHUSDT", "status": "FILLED" });
        assert!(matches!(
            parse_market_fill(&body),
            Err(GatewayError::MissingField { .. })
        ));
    }
}
