// =============================================================================
// Order Book Normaliser — depth-limited `{price, size}` views
// =============================================================================

use serde::Serialize;

use super::{numeric, MarketError};
use crate::exchange::{RawOrderBook, RawRow};

/// One price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub size: f64,
}

/// Response payload for `/api/orderbook/{symbol}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBookView {
    pub symbol: String,
    /// Best (highest) bid first.
    pub bids: Vec<OrderBookLevel>,
    /// Best (lowest) ask first.
    pub asks: Vec<OrderBookLevel>,
    /// Exchange time of the snapshot in epoch milliseconds, `null` if the
    /// exchange did not report one.
    pub timestamp: Option<i64>,
}

/// Keep at most `limit` levels per side in the gateway's own order.
///
/// The gateway may return more levels than requested; it is never asked to
/// re-sort, so the first level of each side must already be the best price.
pub fn normalize(symbol: &str, raw: &RawOrderBook, limit: usize) -> Result<OrderBookView, MarketError> {
    let bids = raw
        .bids
        .as_deref()
        .ok_or_else(|| MarketError::UpstreamData("order book missing 'bids'".into()))?;
    let asks = raw
        .asks
        .as_deref()
        .ok_or_else(|| MarketError::UpstreamData("order book missing 'asks'".into()))?;

    Ok(OrderBookView {
        symbol: symbol.to_string(),
        bids: side("bids", bids, limit)?,
        asks: side("asks", asks, limit)?,
        timestamp: raw.timestamp,
    })
}

fn side(name: &str, levels: &[RawRow], limit: usize) -> Result<Vec<OrderBookLevel>, MarketError> {
    levels
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, lvl)| {
            let price = lvl.first().and_then(numeric);
            let size = lvl.get(1).and_then(numeric);
            match (price, size) {
                (Some(price), Some(size)) => Ok(OrderBookLevel { price, size }),
                _ => Err(MarketError::UpstreamData(format!(
                    "{name}[{i}] is not a [price, size] pair"
                ))),
            }
        })
        .collect()
}
