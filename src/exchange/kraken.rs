// =============================================================================
// Kraken REST Client — public market-data endpoints
// =============================================================================
//
// Only unauthenticated endpoints are used (OHLC, Ticker, Depth), so no API
// key or request signing is involved. Responses are reshaped into the raw
// row / snapshot forms of `ExchangeGateway`; numeric validation is left to
// the pipeline so that malformed exchange data is reported consistently no
// matter which adapter produced it.
//
// Kraken envelope: `{ "error": [..], "result": { "<PAIR>": ..., "last": .. } }`
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{ExchangeGateway, GatewayError, RawOrderBook, RawRow, RawTicker};
use crate::market_data::numeric;

/// Kraken public REST client.
#[derive(Clone)]
pub struct KrakenClient {
    base_url: String,
    client: reqwest::Client,
}

impl KrakenClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new client against `base_url` (normally `https://api.kraken.com`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent(concat!("signal-desk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "KrakenClient initialised");

        Ok(Self { base_url, client })
    }

    // -------------------------------------------------------------------------
    // Symbol / timeframe mapping
    // -------------------------------------------------------------------------

    /// Translate a `BASE/QUOTE` symbol into Kraken's pair name
    /// (`BTC/USD` → `XBTUSD`).
    pub fn pair_for(symbol: &str) -> Result<String, GatewayError> {
        let (base, quote) = symbol
            .split_once('/')
            .filter(|(b, q)| !b.is_empty() && !q.is_empty() && !q.contains('/'))
            .ok_or_else(|| GatewayError::Unsupported(format!("symbol '{symbol}'")))?;

        fn asset(code: &str) -> String {
            match code.to_uppercase().as_str() {
                "BTC" => "XBT".to_string(),
                "DOGE" => "XDG".to_string(),
                other => other.to_string(),
            }
        }

        Ok(format!("{}{}", asset(base), asset(quote)))
    }

    /// Kraken OHLC interval (minutes) for a ccxt-style timeframe string.
    pub fn interval_minutes(timeframe: &str) -> Result<u32, GatewayError> {
        let minutes = match timeframe {
            "1m" => 1,
            "5m" => 5,
            "15m" => 15,
            "30m" => 30,
            "1h" => 60,
            "4h" => 240,
            "1d" => 1440,
            "1w" => 10080,
            "2w" => 21600,
            other => return Err(GatewayError::Unsupported(format!("timeframe '{other}'"))),
        };
        Ok(minutes)
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// GET a public endpoint and unwrap the Kraken envelope into `result`.
    async fn public_get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("GET {path}: {e}")))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(GatewayError::Network(format!("GET {path} returned {status}")));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Exchange(format!("GET {path}: undecodable body: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Exchange(format!("GET {path} returned {status}")));
        }

        unwrap_envelope(body)
    }
}

// -----------------------------------------------------------------------------
// Response reshaping (pure, unit-tested against literal payloads)
// -----------------------------------------------------------------------------

fn unwrap_envelope(mut body: Value) -> Result<Value, GatewayError> {
    if let Some(errors) = body.get("error").and_then(Value::as_array) {
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GatewayError::Exchange(joined));
        }
    }
    match body.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(GatewayError::Exchange("response missing 'result'".into())),
    }
}

/// The `result` object is keyed by Kraken's canonical pair name, which often
/// differs from the requested one (`XBTUSD` → `XXBTZUSD`). OHLC responses
/// also carry a `last` cursor alongside it.
fn pair_entry(result: &Value) -> Option<&Value> {
    result
        .as_object()?
        .iter()
        .find(|(k, _)| k.as_str() != "last")
        .map(|(_, v)| v)
}

/// OHLC entries are `[time_s, open, high, low, close, vwap, volume, count]`;
/// reshape to `[time_ms, open, high, low, close, volume]` and keep the most
/// recent `limit`. Entries too short to reshape are passed through untouched
/// so the series builder reports them.
fn parse_ohlc(result: &Value, limit: usize) -> Result<Vec<RawRow>, GatewayError> {
    let entries = pair_entry(result)
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::Exchange("OHLC result missing pair entry".into()))?;

    let mut rows: Vec<RawRow> = entries
        .iter()
        .map(|entry| match entry.as_array() {
            Some(arr) if arr.len() >= 7 => {
                let time_ms = match &arr[0] {
                    Value::Number(n) => n
                        .as_i64()
                        .map(|s| json!(s.saturating_mul(1000)))
                        .unwrap_or_else(|| arr[0].clone()),
                    other => other.clone(),
                };
                vec![
                    time_ms,
                    arr[1].clone(),
                    arr[2].clone(),
                    arr[3].clone(),
                    arr[4].clone(),
                    arr[6].clone(),
                ]
            }
            Some(arr) => arr.clone(),
            None => vec![entry.clone()],
        })
        .collect();

    let start = rows.len().saturating_sub(limit);
    Ok(rows.split_off(start))
}

/// Ticker fields: `c` last trade, `o` today's open, `h`/`l`/`v`/`p` are
/// `[today, last 24h]` pairs for high, low, volume and VWAP.
fn parse_ticker(result: &Value) -> Result<RawTicker, GatewayError> {
    let entry = pair_entry(result)
        .ok_or_else(|| GatewayError::Exchange("Ticker result missing pair entry".into()))?;

    let at = |key: &str, idx: usize| entry.get(key).and_then(|v| v.get(idx)).and_then(numeric);

    let last = at("c", 0);
    let open = entry.get("o").and_then(numeric);
    let base_volume = at("v", 1);
    let vwap = at("p", 1);

    let percentage = match (last, open) {
        (Some(last), Some(open)) if open != 0.0 => Some((last - open) / open * 100.0),
        _ => None,
    };

    Ok(RawTicker {
        last,
        percentage,
        quote_volume: base_volume.zip(vwap).map(|(v, p)| v * p),
        high: at("h", 1),
        low: at("l", 1),
    })
}

/// Depth levels are `[price, volume, timestamp_s]`, best price first.
fn parse_depth(result: &Value) -> Result<RawOrderBook, GatewayError> {
    let entry = pair_entry(result)
        .ok_or_else(|| GatewayError::Exchange("Depth result missing pair entry".into()))?;

    let side = |key: &str| -> Option<Vec<RawRow>> {
        entry.get(key).and_then(Value::as_array).map(|levels| {
            levels
                .iter()
                .map(|lvl| lvl.as_array().cloned().unwrap_or_else(|| vec![lvl.clone()]))
                .collect()
        })
    };

    let bids = side("bids");
    let asks = side("asks");

    let timestamp = bids
        .iter()
        .chain(asks.iter())
        .flatten()
        .filter_map(|lvl| lvl.get(2).and_then(numeric))
        .map(|secs| (secs * 1000.0) as i64)
        .max();

    Ok(RawOrderBook { bids, asks, timestamp })
}

// -----------------------------------------------------------------------------
// Gateway implementation
// -----------------------------------------------------------------------------

#[async_trait]
impl ExchangeGateway for KrakenClient {
    /// GET /0/public/OHLC
    #[instrument(skip(self), name = "kraken::fetch_candles")]
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<RawRow>, GatewayError> {
        let pair = Self::pair_for(symbol)?;
        let interval = Self::interval_minutes(timeframe)?;

        let result = self
            .public_get(
                "/0/public/OHLC",
                &[("pair", pair), ("interval", interval.to_string())],
            )
            .await?;

        let rows = parse_ohlc(&result, limit)?;
        debug!(symbol, timeframe, count = rows.len(), "candles fetched");
        Ok(rows)
    }

    /// GET /0/public/Ticker
    #[instrument(skip(self), name = "kraken::fetch_ticker")]
    async fn fetch_ticker(&self, symbol: &str) -> Result<RawTicker, GatewayError> {
        let pair = Self::pair_for(symbol)?;
        let result = self.public_get("/0/public/Ticker", &[("pair", pair)]).await?;
        parse_ticker(&result)
    }

    /// GET /0/public/Depth
    #[instrument(skip(self), name = "kraken::fetch_order_book")]
    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<RawOrderBook, GatewayError> {
        let pair = Self::pair_for(symbol)?;
        let result = self
            .public_get("/0/public/Depth", &[("pair", pair), ("count", limit.to_string())])
            .await?;
        parse_depth(&result)
    }
}

impl std::fmt::Debug for KrakenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrakenClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
