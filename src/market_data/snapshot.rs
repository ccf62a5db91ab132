// =============================================================================
// Market Snapshot Assembler
// =============================================================================
//
// Joins the 24h ticker, the latest rolling statistic, the derived signal and
// a bounded chart window into the `/api/market/{symbol}` payload.
//
// Wire contract: `zscore` and `volatility` are plain numbers and an
// undefined statistic is reported as 0. The undefined/zero distinction is
// kept on the struct (`stats`, not serialised) for callers that need it.
// =============================================================================

use serde::Serialize;

use super::{Candle, CandleSeries, MarketError};
use crate::config::AnalysisParams;
use crate::exchange::RawTicker;
use crate::indicators::{RollingStat, RollingStatsEngine};
use crate::signals::SignalClassifier;
use crate::types::Signal;

/// Response payload for one market-data request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub zscore: f64,
    pub volatility: f64,
    pub signal: Signal,
    pub chart_data: Vec<Candle>,
    /// Statistic of the final candle with undefined values preserved.
    #[serde(skip)]
    pub stats: RollingStat,
}

/// The ticker fields the snapshot cannot be built without.
struct TickerFields {
    last: f64,
    percentage: f64,
    quote_volume: f64,
    high: f64,
    low: f64,
}

impl TickerFields {
    fn require(ticker: &RawTicker) -> Result<Self, MarketError> {
        let fields = [
            ("last", ticker.last),
            ("percentage", ticker.percentage),
            ("quoteVolume", ticker.quote_volume),
            ("high", ticker.high),
            ("low", ticker.low),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| !v.is_some_and(f64::is_finite))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(MarketError::UpstreamData(format!(
                "ticker missing required fields: {}",
                missing.join(", ")
            )));
        }

        // Every field was checked above.
        let get = |v: Option<f64>| v.unwrap_or_default();
        Ok(Self {
            last: get(ticker.last),
            percentage: get(ticker.percentage),
            quote_volume: get(ticker.quote_volume),
            high: get(ticker.high),
            low: get(ticker.low),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MarketSnapshotAssembler {
    engine: RollingStatsEngine,
    classifier: SignalClassifier,
    chart_len: usize,
}

impl MarketSnapshotAssembler {
    pub fn new(params: &AnalysisParams) -> Self {
        Self {
            engine: RollingStatsEngine::new(params.window),
            classifier: SignalClassifier::from_params(params),
            chart_len: params.chart_len,
        }
    }

    pub fn assemble(
        &self,
        symbol: &str,
        series: &CandleSeries,
        ticker: &RawTicker,
    ) -> Result<MarketSnapshot, MarketError> {
        let ticker = TickerFields::require(ticker)?;

        let stats = self.engine.latest(&series.closes());
        let signal = self.classifier.classify(stats.z_score);

        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            current_price: ticker.last,
            change_24h: ticker.percentage,
            volume_24h: ticker.quote_volume,
            high_24h: ticker.high,
            low_24h: ticker.low,
            zscore: stats.z_score.unwrap_or(0.0),
            volatility: stats.std_dev.unwrap_or(0.0),
            signal,
            chart_data: series.tail(self.chart_len).to_vec(),
            stats,
        })
    }
}

impl Default for MarketSnapshotAssembler {
    fn default() -> Self {
        Self::new(&AnalysisParams::default())
    }
}
