//! Scripted in-memory gateway for pipeline and router tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use super::{ExchangeGateway, GatewayError, RawOrderBook, RawRow, RawTicker};

pub struct FakeGateway {
    pub candles: Mutex<Result<Vec<RawRow>, GatewayError>>,
    pub ticker: Mutex<Result<RawTicker, GatewayError>>,
    pub book: Mutex<Result<RawOrderBook, GatewayError>>,
    /// Symbols seen by any call, in order.
    pub seen_symbols: Mutex<Vec<String>>,
    pub calls: AtomicU32,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            candles: Mutex::new(Ok(Vec::new())),
            ticker: Mutex::new(Ok(RawTicker::default())),
            book: Mutex::new(Ok(RawOrderBook::default())),
            seen_symbols: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }
}

impl FakeGateway {
    pub fn with_candles(rows: Vec<RawRow>, ticker: RawTicker) -> Self {
        let fake = Self::default();
        *fake.candles.lock() = Ok(rows);
        *fake.ticker.lock() = Ok(ticker);
        fake
    }

    fn record(&self, symbol: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_symbols.lock().push(symbol.to_string());
    }
}

/// `count` hourly candles starting at 2024-01-01T00:00Z with closes
/// `start, start + step, ...`.
pub fn hourly_rows(count: usize, start: f64, step: f64) -> Vec<RawRow> {
    const T0_MS: i64 = 1_704_067_200_000;
    (0..count)
        .map(|i| {
            let close = start + step * i as f64;
            vec![
                json!(T0_MS + i as i64 * 3_600_000),
                json!(close - 0.5),
                json!(close + 1.0),
                json!(close - 1.0),
                json!(close),
                json!(10.0 + i as f64),
            ]
        })
        .collect()
}

pub fn sample_ticker() -> RawTicker {
    RawTicker {
        last: Some(50_000.0),
        percentage: Some(2.5),
        quote_volume: Some(1_000_000.0),
        high: Some(51_000.0),
        low: Some(49_000.0),
    }
}

/// `levels` bids descending from 100 and asks ascending from 101.
pub fn sample_book(levels: usize) -> RawOrderBook {
    let bids = (0..levels)
        .map(|i| vec![json!(format!("{}", 100.0 - i as f64)), json!(format!("{}", 1.0 + i as f64))])
        .collect();
    let asks = (0..levels)
        .map(|i| vec![json!(101.0 + i as f64), json!(0.5 + i as f64)])
        .collect();
    RawOrderBook {
        bids: Some(bids),
        asks: Some(asks),
        timestamp: Some(1_704_067_200_000),
    }
}

#[async_trait]
impl ExchangeGateway for FakeGateway {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: &str,
        limit: usize,
    ) -> Result<Vec<RawRow>, GatewayError> {
        self.record(symbol);
        let mut rows = self.candles.lock().clone()?;
        let start = rows.len().saturating_sub(limit);
        Ok(rows.split_off(start))
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<RawTicker, GatewayError> {
        self.record(symbol);
        self.ticker.lock().clone()
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        _limit: usize,
    ) -> Result<RawOrderBook, GatewayError> {
        self.record(symbol);
        self.book.lock().clone()
    }
}
