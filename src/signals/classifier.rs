// =============================================================================
// Signal Classifier — z-score thresholds → LONG / SHORT / NEUTRAL
// =============================================================================
//
// Mean-reversion heuristic: a close far below its rolling mean is treated as
// oversold (LONG), far above as overbought (SHORT). Both comparisons are
// strict, so a z-score sitting exactly on a threshold stays NEUTRAL. An
// undefined (or NaN) z-score is always NEUTRAL.

use crate::config::AnalysisParams;
use crate::types::Signal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalClassifier {
    long_below: f64,
    short_above: f64,
}

impl SignalClassifier {
    pub const DEFAULT_LONG_BELOW: f64 = -2.0;
    pub const DEFAULT_SHORT_ABOVE: f64 = 2.0;

    pub fn new(long_below: f64, short_above: f64) -> Self {
        Self {
            long_below,
            short_above,
        }
    }

    pub fn from_params(params: &AnalysisParams) -> Self {
        Self::new(params.long_below, params.short_above)
    }

    pub fn classify(&self, z_score: Option<f64>) -> Signal {
        match z_score {
            Some(z) if z < self.long_below => Signal::Long,
            Some(z) if z > self.short_above => Signal::Short,
            _ => Signal::Neutral,
        }
    }
}

impl Default for SignalClassifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LONG_BELOW, Self::DEFAULT_SHORT_ABOVE)
    }
}
