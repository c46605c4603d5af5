// =============================================================================
// Analyzer Snapshot - the atomic unit of published state
// =============================================================================
//
// A snapshot is either a data snapshot (strikes populated, derived fields
// computed from the same payload) or a degraded snapshot (every field carried
// forward from the previously published one, only `errors` extended).
// Snapshots are never mutated after publication; the shared cell swaps them
// wholesale.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{BuildUp, MarketBias};

/// Maximum number of error messages carried in a snapshot.
pub const MAX_RECENT_ERRORS: usize = 5;

/// Market figures for one side (call or put) of one strike.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionLeg {
    /// Open interest in contracts.
    pub oi: i64,
    /// Change in open interest since the previous session.
    pub change_oi: i64,
    /// Total traded volume.
    pub volume: i64,
    /// Last traded price.
    pub ltp: f64,
    /// Price change since the previous close.
    pub price_change: f64,
    pub build_up: BuildUp,
}

/// One strike price with both sides of the chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrikeRow {
    pub strike: f64,
    pub call: OptionLeg,
    pub put: OptionLeg,
}

/// Figures for the strike closest to the underlying.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtmAnalysis {
    pub strike: f64,
    pub call_ltp: f64,
    pub put_ltp: f64,
    pub call_oi: i64,
    pub put_oi: i64,
    pub call_build_up: BuildUp,
    pub put_build_up: BuildUp,
}

/// Chain-wide aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSummary {
    /// Reference price of the underlying index.
    pub underlying: f64,
    pub total_call_change_oi: i64,
    pub total_put_change_oi: i64,
}

/// Latest computed analytics, as seen by readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyzerSnapshot {
    /// When the analytics were computed. `None` only before the first cycle.
    pub timestamp: Option<DateTime<Utc>>,
    pub market_bias: MarketBias,
    /// Strike with the highest call open interest.
    pub top_resistance: Option<f64>,
    /// Strike with the highest put open interest.
    pub top_support: Option<f64>,
    pub atm_analysis: Option<AtmAnalysis>,
    pub summary: Option<ChainSummary>,
    /// One row per strike, in source order.
    pub strikes: Vec<StrikeRow>,
    /// Most recent cycle errors, oldest first, at most [`MAX_RECENT_ERRORS`].
    pub errors: Vec<String>,
}

impl AnalyzerSnapshot {
    /// Build the snapshot published after a failed cycle: every field copied
    /// from `self`, with `error` appended to the rolling error list.
    pub fn degrade(&self, error: impl std::fmt::Display) -> Self {
        let mut errors = self.errors.clone();
        errors.push(error.to_string());
        if errors.len() > MAX_RECENT_ERRORS {
            errors.drain(..errors.len() - MAX_RECENT_ERRORS);
        }

        Self {
            errors,
            ..self.clone()
        }
    }

    /// `true` when the snapshot carries analytics (not the empty initial
    /// value and not a no-strike result).
    pub fn has_data(&self) -> bool {
        !self.strikes.is_empty()
    }
}
