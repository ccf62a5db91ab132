pub mod error;
pub mod orderbook;
pub mod series;
pub mod service;
pub mod snapshot;

use serde_json::Value;

pub use error::MarketError;
pub use orderbook::OrderBookView;
pub use series::{Candle, CandleSeries};
pub use service::MarketService;
pub use snapshot::{MarketSnapshot, MarketSnapshotAssembler};

/// URL-safe `BTC-USD` → exchange-native `BTC/USD`.
pub fn normalize_symbol(path_symbol: &str) -> String {
    path_symbol.trim().replace('-', "/")
}

/// Accept JSON numbers and numeric strings; reject NaN and infinities.
pub(crate) fn numeric(val: &Value) -> Option<f64> {
    let n = match val {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
