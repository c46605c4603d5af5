// =============================================================================
// NSE Data Source
// =============================================================================
//
// The scheduler talks to the upstream through the `DataSource` trait so that
// the polling loop can be driven by the real NSE client or by a test double.
// A fetch either yields the raw option-chain document or a `FetchError`; no
// retries happen here, the polling cadence is the retry policy.

pub mod client;

pub use client::NseClient;

use async_trait::async_trait;
use thiserror::Error;

/// Which request of the two-step fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Landing-page request that establishes session cookies.
    WarmUp,
    /// The option-chain data request itself.
    OptionChain,
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WarmUp => write!(f, "warm-up"),
            Self::OptionChain => write!(f, "option-chain"),
        }
    }
}

/// Errors raised while fetching a payload from the upstream.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{stage} request timed out")]
    Timeout { stage: FetchStage },

    #[error("{stage} request failed: {source}")]
    Transport {
        stage: FetchStage,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} request returned HTTP {status}")]
    Status {
        stage: FetchStage,
        status: reqwest::StatusCode,
    },

    #[error("malformed {stage} response body: {source}")]
    Decode {
        stage: FetchStage,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Classify a reqwest error raised during `stage`.
    pub fn from_reqwest(stage: FetchStage, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { stage }
        } else {
            Self::Transport { stage, source }
        }
    }

    pub fn stage(&self) -> FetchStage {
        match self {
            Self::Timeout { stage }
            | Self::Transport { stage, .. }
            | Self::Status { stage, .. }
            | Self::Decode { stage, .. } => *stage,
        }
    }
}

/// Opaque option-chain document as returned by the upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload(pub serde_json::Value);

impl From<serde_json::Value> for RawPayload {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Source of raw option-chain payloads.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> Result<RawPayload, FetchError>;
}
