// =============================================================================
// Exchange Gateway — the opaque market-data source behind the pipeline
// =============================================================================
//
// The pipeline only ever sees raw rows and loosely-typed snapshots. Shape
// validation happens downstream (series builder, snapshot assembler, order
// book normaliser) so that every gateway implementation stays a thin
// transport adapter.
// =============================================================================

pub mod guard;
pub mod kraken;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use guard::{GatewayGuard, GuardSnapshot};
pub use kraken::KrakenClient;

/// One raw OHLCV row as delivered by the exchange:
/// `[timestampMillis, open, high, low, close, volume, ...]`.
pub type RawRow = Vec<Value>;

/// 24h ticker fields consumed by the snapshot assembler. Every field is
/// optional here; the assembler decides which ones are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTicker {
    pub last: Option<f64>,
    pub percentage: Option<f64>,
    pub quote_volume: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

/// Raw order book: each level is `[price, size, ...]`, best price first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOrderBook {
    pub bids: Option<Vec<RawRow>>,
    pub asks: Option<Vec<RawRow>>,
    /// Exchange-side time of the snapshot in epoch milliseconds, if known.
    pub timestamp: Option<i64>,
}

/// Failure talking to the exchange.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transport-level failure (connect, reset, 5xx body unreadable).
    #[error("network error: {0}")]
    Network(String),
    /// The exchange answered but rejected the request.
    #[error("exchange error: {0}")]
    Exchange(String),
    /// The call did not complete within the guard's deadline.
    #[error("gateway call timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// Symbol or timeframe the exchange adapter cannot express.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl GatewayError {
    /// Only transport failures are worth retrying; anything the exchange
    /// answered deliberately will be answered the same way again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Source of raw market data. Implementations must be cheap to share across
/// requests (`Arc<dyn ExchangeGateway>`).
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Most recent `limit` candles for `symbol` (native `BASE/QUOTE` form),
    /// oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<RawRow>, GatewayError>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<RawTicker, GatewayError>;

    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<RawOrderBook, GatewayError>;
}
