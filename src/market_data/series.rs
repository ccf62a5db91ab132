// =============================================================================
// Series Builder — raw OHLCV rows → typed, time-ordered candles
// =============================================================================
//
// Rows arrive as `[timestampMillis, open, high, low, close, volume, ...]`.
// Exchanges send numbers either as JSON numbers or as numeric strings; both
// are accepted. Input order is preserved, never re-sorted: the gateway must
// deliver strictly ascending timestamps and a series that violates this is
// rejected as a whole.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use super::{numeric, MarketError};
use crate::exchange::RawRow;

/// Number of leading fields every row must carry.
const ROW_FIELDS: usize = 6;

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candles in strictly ascending timestamp order, owned by one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series from raw gateway rows.
    pub fn from_rows(rows: &[RawRow]) -> Result<Self, MarketError> {
        let candles = rows
            .iter()
            .enumerate()
            .map(|(index, row)| parse_row(index, row))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(index) = candles
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(MarketError::UpstreamData(format!(
                "candle timestamps not strictly ascending at row {}",
                index + 1
            )));
        }

        Ok(Self { candles })
    }

    #[cfg(test)]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// The most recent `count` candles (oldest first).
    pub fn tail(&self, count: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(count);
        &self.candles[start..]
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

fn parse_row(index: usize, row: &RawRow) -> Result<Candle, MarketError> {
    if row.len() < ROW_FIELDS {
        return Err(MarketError::MalformedRow {
            index,
            reason: format!("expected at least {ROW_FIELDS} fields, got {}", row.len()),
        });
    }

    let field = |pos: usize, name: &str| -> Result<f64, MarketError> {
        numeric(&row[pos]).ok_or_else(|| MarketError::MalformedRow {
            index,
            reason: format!("{name} is not numeric: {}", row[pos]),
        })
    };

    let millis = field(0, "timestamp")?;
    let timestamp = Utc
        .timestamp_millis_opt(millis as i64)
        .single()
        .filter(|_| millis.fract() == 0.0)
        .ok_or_else(|| MarketError::MalformedRow {
            index,
            reason: format!("timestamp {millis} is not a valid epoch-millisecond instant"),
        })?;

    Ok(Candle {
        timestamp,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
    })
}
