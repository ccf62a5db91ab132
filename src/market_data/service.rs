// =============================================================================
// Market Service — request-scoped pipeline over the guarded gateway
// =============================================================================
//
//   gateway ──rows──▶ CandleSeries ──closes──▶ RollingStatsEngine
//                                                   │
//   gateway ──ticker─────────────────────▶ MarketSnapshotAssembler ──▶ JSON
//
//   gateway ──book──▶ orderbook::normalize ──▶ JSON
//
// Nothing here is shared between requests except the gateway and its guard;
// every series, statistic and snapshot lives and dies with one call.
// =============================================================================

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{
    normalize_symbol, orderbook, CandleSeries, MarketError, MarketSnapshot,
    MarketSnapshotAssembler, OrderBookView,
};
use crate::config::{RequestLimits, ServiceConfig};
use crate::exchange::{ExchangeGateway, GatewayGuard};

/// Timeframe used when the caller does not specify one.
pub const DEFAULT_TIMEFRAME: &str = "1h";

pub struct MarketService {
    gateway: Arc<dyn ExchangeGateway>,
    guard: Arc<GatewayGuard>,
    assembler: MarketSnapshotAssembler,
    limits: RequestLimits,
}

impl MarketService {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        guard: Arc<GatewayGuard>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            gateway,
            guard,
            assembler: MarketSnapshotAssembler::new(&config.analysis),
            limits: config.limits.clone(),
        }
    }

    pub fn guard(&self) -> &GatewayGuard {
        &self.guard
    }

    /// Candles + ticker → statistics → signal → snapshot.
    pub async fn market_snapshot(
        &self,
        path_symbol: &str,
        timeframe: Option<&str>,
        limit: Option<usize>,
    ) -> Result<MarketSnapshot, MarketError> {
        let symbol = checked_symbol(path_symbol)?;
        let timeframe = timeframe.map(str::trim).unwrap_or(DEFAULT_TIMEFRAME);
        if timeframe.is_empty() {
            return Err(MarketError::InvalidRequest("timeframe must not be empty".into()));
        }
        let limit = checked_limit(limit, self.limits.default_candles, self.limits.max_candles)?;

        let gateway = &self.gateway;
        let (rows, ticker) = tokio::try_join!(
            self.guard
                .run("fetch_candles", || gateway.fetch_candles(&symbol, timeframe, limit)),
            self.guard.run("fetch_ticker", || gateway.fetch_ticker(&symbol)),
        )?;

        let series = CandleSeries::from_rows(&rows)?;
        if series.is_empty() {
            warn!(symbol = %symbol, timeframe, "exchange returned no candles");
        }
        debug!(symbol = %symbol, timeframe, candles = series.len(), "candle series built");

        let snapshot = self.assembler.assemble(&symbol, &series, &ticker)?;

        info!(
            symbol = %symbol,
            timeframe,
            candles = series.len(),
            zscore = ?snapshot.stats.z_score,
            signal = %snapshot.signal,
            "market snapshot assembled"
        );
        Ok(snapshot)
    }

    /// Depth-limited order book.
    pub async fn order_book(
        &self,
        path_symbol: &str,
        limit: Option<usize>,
    ) -> Result<OrderBookView, MarketError> {
        let symbol = checked_symbol(path_symbol)?;
        let limit = checked_limit(limit, self.limits.default_depth, self.limits.max_depth)?;

        let gateway = &self.gateway;
        let raw = self
            .guard
            .run("fetch_order_book", || gateway.fetch_order_book(&symbol, limit))
            .await?;

        let view = orderbook::normalize(&symbol, &raw, limit)?;
        debug!(
            symbol = %symbol,
            bids = view.bids.len(),
            asks = view.asks.len(),
            "order book normalised"
        );
        Ok(view)
    }
}

fn checked_symbol(path_symbol: &str) -> Result<String, MarketError> {
    let symbol = normalize_symbol(path_symbol);
    if symbol.is_empty() {
        return Err(MarketError::InvalidRequest("symbol must not be empty".into()));
    }
    Ok(symbol)
}

fn checked_limit(requested: Option<usize>, default: usize, max: usize) -> Result<usize, MarketError> {
    match requested.unwrap_or(default) {
        n if (1..=max).contains(&n) => Ok(n),
        n => Err(MarketError::InvalidRequest(format!("limit must be in 1..={max}, got {n}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::fake::{hourly_rows, sample_book, sample_ticker, FakeGateway};
    use crate::exchange::GatewayError;
    use crate::types::Signal;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn service(fake: Arc<FakeGateway>) -> MarketService {
        let config = ServiceConfig::default();
        let guard = Arc::new(GatewayGuard::new(&config.gateway));
        MarketService::new(fake, guard, &config)
    }

    #[tokio::test]
    async fn end_to_end_rising_series() {
        let fake = Arc::new(FakeGateway::with_candles(hourly_rows(25, 100.0, 1.0), sample_ticker()));
        let snap = service(fake.clone())
            .market_snapshot("BTC-USD", Some("1h"), None)
            .await
            .unwrap();

        assert_eq!(snap.symbol, "BTC/USD");
        assert_eq!(snap.current_price, 50_000.0);
        assert_eq!(snap.change_24h, 2.5);
        assert_eq!(snap.chart_data.len(), 25);
        let z = snap.stats.z_score.expect("defined z-score");
        assert!(z > 0.0);
        assert_eq!(snap.signal, Signal::Neutral);

        // Every gateway call used the slash form.
        assert!(fake.seen_symbols.lock().iter().all(|s| s == "BTC/USD"));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn short_series_is_neutral_with_zero_display_values() {
        let fake = Arc::new(FakeGateway::with_candles(hourly_rows(12, 100.0, 1.0), sample_ticker()));
        let snap = service(fake).market_snapshot("ETH-USD", None, None).await.unwrap();
        assert_eq!(snap.zscore, 0.0);
        assert_eq!(snap.volatility, 0.0);
        assert_eq!(snap.signal, Signal::Neutral);
        assert!(snap.stats.z_score.is_none());
    }

    #[tokio::test]
    async fn malformed_row_aborts_the_request() {
        let mut rows = hourly_rows(25, 100.0, 1.0);
        rows[7] = vec![json!(0), json!("x")];
        let fake = Arc::new(FakeGateway::with_candles(rows, sample_ticker()));
        let err = service(fake).market_snapshot("BTC-USD", None, None).await.unwrap_err();
        assert!(matches!(err, MarketError::MalformedRow { index: 7, .. }));
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_as_gateway_error() {
        let fake = Arc::new(FakeGateway::with_candles(hourly_rows(25, 100.0, 1.0), sample_ticker()));
        *fake.ticker.lock() = Err(GatewayError::Exchange("EService:Unavailable".into()));
        let err = service(fake).market_snapshot("BTC-USD", None, None).await.unwrap_err();
        assert!(matches!(err, MarketError::Gateway(GatewayError::Exchange(_))));
    }

    #[tokio::test]
    async fn invalid_limits_are_rejected_before_any_gateway_call() {
        let fake = Arc::new(FakeGateway::with_candles(hourly_rows(25, 100.0, 1.0), sample_ticker()));
        let svc = service(fake.clone());
        assert!(matches!(
            svc.market_snapshot("BTC-USD", None, Some(0)).await,
            Err(MarketError::InvalidRequest(_))
        ));
        assert!(matches!(
            svc.order_book("BTC-USD", Some(100_000)).await,
            Err(MarketError::InvalidRequest(_))
        ));
        assert!(matches!(
            svc.market_snapshot("", None, None).await,
            Err(MarketError::InvalidRequest(_))
        ));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn candle_limit_is_forwarded() {
        let fake = Arc::new(FakeGateway::with_candles(hourly_rows(120, 100.0, 0.5), sample_ticker()));
        let snap = service(fake).market_snapshot("BTC-USD", None, Some(30)).await.unwrap();
        // 30 candles fetched, chart capped at 50 → all 30.
        assert_eq!(snap.chart_data.len(), 30);
    }

    #[tokio::test]
    async fn order_book_is_trimmed() {
        let fake = Arc::new(FakeGateway::default());
        *fake.book.lock() = Ok(sample_book(20));
        let view = service(fake).order_book("BTC-USD", Some(5)).await.unwrap();
        assert_eq!(view.symbol, "BTC/USD");
        assert_eq!(view.bids.len(), 5);
        assert_eq!(view.asks.len(), 5);
        assert_eq!(view.bids[0].price, 100.0);
    }

    #[tokio::test]
    async fn order_book_missing_side_is_upstream_error() {
        let fake = Arc::new(FakeGateway::default());
        let mut book = sample_book(4);
        book.bids = None;
        *fake.book.lock() = Ok(book);
        let err = service(fake).order_book("BTC-USD", None).await.unwrap_err();
        assert!(matches!(err, MarketError::UpstreamData(_)));
    }
}
