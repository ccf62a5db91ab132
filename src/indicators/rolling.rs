// =============================================================================
// Rolling Statistics — trailing mean, sample σ and z-score of closes
// =============================================================================
//
// For a window W and index i:
//   i < W-1   → nothing defined (insufficient history)
//   i >= W-1  → mean  = Σ close[i-W+1..=i] / W
//               σ     = sqrt(Σ (x - mean)² / (W - 1))      (sample, N-1)
//               z     = (close[i] - mean) / σ               when σ != 0
//
// Each index only reads its own window, so later candles can never leak into
// an earlier statistic. A window whose closes are all identical has σ = 0
// exactly; floating-point residue from the mean is not allowed to fabricate
// a z-score.

use serde::Serialize;

/// Statistics for one index of the series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RollingStat {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub z_score: Option<f64>,
}

/// Fixed-window rolling statistics over a close-price series.
#[derive(Debug, Clone, Copy)]
pub struct RollingStatsEngine {
    window: usize,
}

impl RollingStatsEngine {
    /// Default trailing window length.
    pub const DEFAULT_WINDOW: usize = 20;

    /// `window` must be at least 2 for the sample deviation to exist; smaller
    /// values are clamped.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
        }
    }

    #[cfg(test)]
    fn window(&self) -> usize {
        self.window
    }

    /// One `RollingStat` per input close.
    pub fn compute(&self, closes: &[f64]) -> Vec<RollingStat> {
        (0..closes.len()).map(|i| self.stat_at(closes, i)).collect()
    }

    /// Statistics for the final index; `RollingStat::default()` for an
    /// empty series.
    pub fn latest(&self, closes: &[f64]) -> RollingStat {
        self.compute(closes).pop().unwrap_or_default()
    }

    fn stat_at(&self, closes: &[f64], i: usize) -> RollingStat {
        let w = self.window;
        if i + 1 < w {
            return RollingStat::default();
        }

        let window = &closes[i + 1 - w..=i];
        let mean = window.iter().sum::<f64>() / w as f64;

        let flat = window.iter().all(|&x| x == window[0]);
        let std_dev = if flat {
            0.0
        } else {
            let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (w - 1) as f64;
            variance.sqrt()
        };

        let z_score = if std_dev > 0.0 && std_dev.is_finite() {
            Some((closes[i] - mean) / std_dev)
        } else {
            None
        };

        RollingStat {
            mean: Some(mean),
            std_dev: Some(std_dev),
            z_score,
        }
    }
}

impl Default for RollingStatsEngine {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}
