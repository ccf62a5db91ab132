use thiserror::Error;

use crate::exchange::GatewayError;

/// Everything that can abort a market-data request.
#[derive(Debug, Clone, Error)]
pub enum MarketError {
    /// A candle row could not be parsed; the gateway contract is broken.
    #[error("malformed candle row {index}: {reason}")]
    MalformedRow { index: usize, reason: String },

    /// A required field is missing or inconsistent in an upstream response.
    #[error("upstream data error: {0}")]
    UpstreamData(String),

    /// The exchange call itself failed.
    #[error(transparent)]
    Gateway(GatewayError),

    /// The exchange did not answer within the guard's deadline.
    #[error("upstream timed out after {0:?}")]
    UpstreamTimeout(std::time::Duration),

    /// The caller asked for something we cannot serve.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<GatewayError> for MarketError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Timeout(after) => Self::UpstreamTimeout(after),
            GatewayError::Unsupported(what) => Self::InvalidRequest(format!("unsupported {what}")),
            other => Self::Gateway(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn gateway_timeouts_become_upstream_timeouts() {
        let e: MarketError = GatewayError::Timeout(Duration::from_secs(10)).into();
        assert!(matches!(e, MarketError::UpstreamTimeout(d) if d == Duration::from_secs(10)));
    }

    #[test]
    fn unsupported_becomes_invalid_request() {
        let e: MarketError = GatewayError::Unsupported("timeframe '3h'".into()).into();
        match e {
            MarketError::InvalidRequest(msg) => assert!(msg.contains("3h")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_gateway_errors_pass_through() {
        let e: MarketError = GatewayError::Network("reset".into()).into();
        assert!(matches!(e, MarketError::Gateway(GatewayError::Network(_))));
    }
}
