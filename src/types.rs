// =============================================================================
// Shared types used across the Aurora indicator feed
// =============================================================================

use serde::{Deserialize, Serialize};

/// Directional classification of a single candle derived from +DI / -DI / ADX.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Long,
    Short,
    Crossover,
    #[default]
    #[serde(rename = "none")]
    Neutral,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::Crossover => write!(f, "crossover"),
            Self::Neutral => write!(f, "none"),
        }
    }
}

/// What the most recent publish cycle delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishOutcome {
    Data,
    Error,
}

impl std::fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Error => write!(f, "error"),
        }
    }
}
