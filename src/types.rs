// =============================================================================
// Shared types used across the option-chain analyzer
// =============================================================================

use serde::{Deserialize, Serialize};

/// Aggregate directional sentiment derived from put vs call OI change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketBias {
    Bullish,
    Bearish,
    Neutral,
}

impl Default for MarketBias {
    fn default() -> Self {
        Self::Neutral
    }
}

impl std::fmt::Display for MarketBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Directional reading of one side of one strike, combining the price move
/// with the open-interest change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildUp {
    #[serde(rename = "Long build-up")]
    Long,
    #[serde(rename = "Short build-up")]
    Short,
    #[serde(rename = "None")]
    None,
}

impl Default for BuildUp {
    fn default() -> Self {
        Self::None
    }
}

impl std::fmt::Display for BuildUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "Long build-up"),
            Self::Short => write!(f, "Short build-up"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Lifecycle phase of the polling scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerPhase {
    Idle,
    Fetching,
    Analyzing,
    Publishing,
    Sleeping,
    Stopped,
}

impl SchedulerPhase {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Fetching => 1,
            Self::Analyzing => 2,
            Self::Publishing => 3,
            Self::Sleeping => 4,
            Self::Stopped => 5,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Fetching,
            2 => Self::Analyzing,
            3 => Self::Publishing,
            4 => Self::Sleeping,
            5 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

impl std::fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Fetching => write!(f, "Fetching"),
            Self::Analyzing => write!(f, "Analyzing"),
            Self::Publishing => write!(f, "Publishing"),
            Self::Sleeping => write!(f, "Sleeping"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}
