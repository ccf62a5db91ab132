// =============================================================================
// Service Configuration — JSON file + environment overrides
// =============================================================================
//
// Every tunable lives here: bind address, exchange endpoint, gateway guard
// limits, the rolling-statistics parameters and token settings.
//
// All fields carry `#[serde(default)]` so a partial (or empty) JSON file is
// always valid. A missing file is not fatal: the caller falls back to
// defaults with a warning. Secrets come from the environment, never from
// the JSON file committed next to the binary.
// =============================================================================

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_exchange_base_url() -> String {
    "https://api.kraken.com".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_inflight() -> usize {
    4
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_window() -> usize {
    20
}

fn default_long_below() -> f64 {
    -2.0
}

fn default_short_above() -> f64 {
    2.0
}

fn default_chart_len() -> usize {
    50
}

fn default_candle_limit() -> usize {
    100
}

fn default_max_candle_limit() -> usize {
    720
}

fn default_depth_limit() -> usize {
    20
}

fn default_max_depth_limit() -> usize {
    500
}

fn default_token_ttl_secs() -> i64 {
    24 * 60 * 60
}

// =============================================================================
// GatewayConfig
// =============================================================================

/// Limits applied to every outbound exchange call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_exchange_base_url")]
    pub base_url: String,

    /// Per-attempt deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum concurrent calls across all requests.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,

    /// Extra attempts for transport failures (0 disables retry).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_exchange_base_url(),
            timeout_ms: default_timeout_ms(),
            max_inflight: default_max_inflight(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

// =============================================================================
// AnalysisParams
// =============================================================================

/// Rolling-statistics and signal parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Trailing window length for mean / standard deviation.
    #[serde(default = "default_window")]
    pub window: usize,

    /// z-scores strictly below this produce LONG.
    #[serde(default = "default_long_below")]
    pub long_below: f64,

    /// z-scores strictly above this produce SHORT.
    #[serde(default = "default_short_above")]
    pub short_above: f64,

    /// Number of trailing candles echoed back as chart data.
    #[serde(default = "default_chart_len")]
    pub chart_len: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            window: default_window(),
            long_below: default_long_below(),
            short_above: default_short_above(),
            chart_len: default_chart_len(),
        }
    }
}

// =============================================================================
// RequestLimits
// =============================================================================

/// Defaults and ceilings for the `limit` query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLimits {
    #[serde(default = "default_candle_limit")]
    pub default_candles: usize,

    #[serde(default = "default_max_candle_limit")]
    pub max_candles: usize,

    #[serde(default = "default_depth_limit")]
    pub default_depth: usize,

    #[serde(default = "default_max_depth_limit")]
    pub max_depth: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            default_candles: default_candle_limit(),
            max_candles: default_max_candle_limit(),
            default_depth: default_depth_limit(),
            max_depth: default_max_depth_limit(),
        }
    }
}

// =============================================================================
// ServiceConfig
// =============================================================================

/// Top-level configuration for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub analysis: AnalysisParams,

    #[serde(default)]
    pub limits: RequestLimits,

    /// HMAC secret for bearer tokens. Only ever populated from the
    /// environment; never written back out.
    #[serde(default, skip_serializing)]
    pub token_secret: Option<String>,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            gateway: GatewayConfig::default(),
            analysis: AnalysisParams::default(),
            limits: RequestLimits::default(),
            token_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read service config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse service config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            window = config.analysis.window,
            "service config loaded"
        );

        Ok(config)
    }

    /// Apply `SIGNAL_DESK_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("SIGNAL_DESK_BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(url) = lookup("SIGNAL_DESK_EXCHANGE_URL").filter(|s| !s.trim().is_empty()) {
            self.gateway.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(secret) = lookup("SIGNAL_DESK_TOKEN_SECRET").filter(|s| !s.is_empty()) {
            self.token_secret = Some(secret);
        }
    }

    /// Reject parameter combinations the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if a.window < 2 {
            bail!("analysis.window must be at least 2 (sample deviation), got {}", a.window);
        }
        if !(a.long_below < a.short_above) {
            bail!(
                "analysis.long_below ({}) must be below analysis.short_above ({})",
                a.long_below,
                a.short_above
            );
        }
        if a.chart_len == 0 {
            bail!("analysis.chart_len must be non-zero");
        }
        let l = &self.limits;
        if l.default_candles == 0 || l.default_candles > l.max_candles {
            bail!("limits.default_candles must be in 1..={}", l.max_candles);
        }
        if l.default_depth == 0 || l.default_depth > l.max_depth {
            bail!("limits.default_depth must be in 1..={}", l.max_depth);
        }
        if self.gateway.max_inflight == 0 {
            bail!("gateway.max_inflight must be non-zero");
        }
        if self.gateway.timeout_ms == 0 {
            bail!("gateway.timeout_ms must be non-zero");
        }
        if self.token_ttl_secs <= 0 {
            bail!("token_ttl_secs must be positive");
        }
        Ok(())
    }
}
