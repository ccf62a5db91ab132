// =============================================================================
// Shared types used across the Signal Desk service
// =============================================================================

use serde::{Deserialize, Serialize};

/// Discrete trading signal derived from the rolling z-score.
///
/// Serialised in upper case (`"LONG"`, `"SHORT"`, `"NEUTRAL"`) to match the
/// wire format existing dashboards consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Long,
    Short,
    Neutral,
}

impl Default for Signal {
    fn default() -> Self {
        Self::Neutral
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}
