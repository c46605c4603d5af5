// =============================================================================
// Option-Chain Analyzer - raw payload to sentiment snapshot
// =============================================================================
//
// Pure transformation, no I/O. Every malformed input maps to a defined
// output: missing legs and fields read as zero, an empty chain yields a fresh
// snapshot carrying a single explanatory error.
//
// Derived indicators:
//   - Build-up per side:  price up + OI added => Long, price down + OI added
//                         => Short, anything else => None
//   - Resistance/support: strike with the largest call/put OI
//   - Market bias:        put vs call OI change with a 10% band around parity
//   - ATM:                strike nearest the underlying
// =============================================================================

use chrono::Utc;
use serde_json::Value;

use crate::nse::RawPayload;
use crate::snapshot::{AnalyzerSnapshot, AtmAnalysis, ChainSummary, OptionLeg, StrikeRow};
use crate::types::{BuildUp, MarketBias};

/// Error recorded when the payload contains no strikes.
pub const NO_STRIKE_DATA: &str = "No strike data returned from source";

/// One side's OI change must exceed the other's by this factor to tip the
/// bias away from Neutral.
const BIAS_THRESHOLD: f64 = 1.1;

// =============================================================================
// Field extraction
// =============================================================================

fn opt_f64(v: &Value) -> Option<f64> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|x| x.is_finite())
}

fn field_f64(obj: &Value, key: &str) -> f64 {
    obj.get(key).and_then(opt_f64).unwrap_or(0.0)
}

fn field_i64(obj: &Value, key: &str) -> i64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(v @ Value::String(_)) => opt_f64(v).map(|f| f as i64).unwrap_or(0),
        _ => 0,
    }
}

fn extract_leg(entry: &Value, key: &str) -> OptionLeg {
    let Some(side) = entry.get(key).filter(|v| v.is_object()) else {
        return OptionLeg::default();
    };

    let mut leg = OptionLeg {
        oi: field_i64(side, "openInterest"),
        change_oi: field_i64(side, "changeinOpenInterest"),
        volume: field_i64(side, "totalTradedVolume"),
        ltp: field_f64(side, "lastPrice"),
        price_change: field_f64(side, "change"),
        build_up: BuildUp::None,
    };
    leg.build_up = classify_build_up(leg.price_change, leg.change_oi);
    leg
}

/// One row per entry of `records.data`, in source order.
fn extract_strike_rows(payload: &Value) -> Vec<StrikeRow> {
    payload
        .pointer("/records/data")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| StrikeRow {
                    strike: field_f64(entry, "strikePrice"),
                    call: extract_leg(entry, "CE"),
                    put: extract_leg(entry, "PE"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `records.underlyingValue`, falling back to `filtered.underlyingValue`.
fn underlying_value(payload: &Value) -> f64 {
    payload
        .pointer("/records/underlyingValue")
        .and_then(opt_f64)
        .or_else(|| payload.pointer("/filtered/underlyingValue").and_then(opt_f64))
        .unwrap_or(0.0)
}

// =============================================================================
// Indicators
// =============================================================================

/// Classify one side of a strike.
///
/// Both directions require fresh OI (`change_oi > 0`); unwinding is always
/// `None`.
pub fn classify_build_up(price_change: f64, change_oi: i64) -> BuildUp {
    if price_change > 0.0 && change_oi > 0 {
        BuildUp::Long
    } else if price_change < 0.0 && change_oi > 0 {
        BuildUp::Short
    } else {
        BuildUp::None
    }
}

/// Bias from total call and put OI change.
pub fn market_bias(total_call_change: i64, total_put_change: i64) -> MarketBias {
    let ce = total_call_change as f64;
    let pe = total_put_change as f64;

    if pe > ce * BIAS_THRESHOLD {
        MarketBias::Bullish
    } else if ce > pe * BIAS_THRESHOLD {
        MarketBias::Bearish
    } else {
        MarketBias::Neutral
    }
}

/// First row holding the maximum of `key`.
fn first_max_by<F>(rows: &[StrikeRow], key: F) -> Option<&StrikeRow>
where
    F: Fn(&StrikeRow) -> i64,
{
    rows.iter().fold(None, |best, row| match best {
        Some(b) if key(b) >= key(row) => Some(b),
        _ => Some(row),
    })
}

/// First row whose strike is nearest `underlying`.
fn nearest_strike(rows: &[StrikeRow], underlying: f64) -> Option<&StrikeRow> {
    rows.iter().min_by(|a, b| {
        (a.strike - underlying)
            .abs()
            .total_cmp(&(b.strike - underlying).abs())
    })
}

// =============================================================================
// Entry point
// =============================================================================

/// Derive a snapshot from a raw option-chain payload.
pub fn analyze(payload: &RawPayload) -> AnalyzerSnapshot {
    let doc = &payload.0;
    let strikes = extract_strike_rows(doc);

    if strikes.is_empty() {
        return AnalyzerSnapshot {
            timestamp: Some(Utc::now()),
            errors: vec![NO_STRIKE_DATA.to_string()],
            ..Default::default()
        };
    }

    let underlying = underlying_value(doc);

    let top_resistance = first_max_by(&strikes, |r| r.call.oi).map(|r| r.strike);
    let top_support = first_max_by(&strikes, |r| r.put.oi).map(|r| r.strike);

    let (total_call_change_oi, total_put_change_oi) =
        strikes.iter().fold((0i64, 0i64), |(ce, pe), r| {
            (
                ce.saturating_add(r.call.change_oi),
                pe.saturating_add(r.put.change_oi),
            )
        });

    let atm_analysis = nearest_strike(&strikes, underlying).map(|atm| AtmAnalysis {
        strike: atm.strike,
        call_ltp: atm.call.ltp,
        put_ltp: atm.put.ltp,
        call_oi: atm.call.oi,
        put_oi: atm.put.oi,
        call_build_up: atm.call.build_up,
        put_build_up: atm.put.build_up,
    });

    AnalyzerSnapshot {
        timestamp: Some(Utc::now()),
        market_bias: market_bias(total_call_change_oi, total_put_change_oi),
        top_resistance,
        top_support,
        atm_analysis,
        summary: Some(ChainSummary {
            underlying,
            total_call_change_oi,
            total_put_change_oi,
        }),
        strikes,
        errors: Vec::new(),
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leg(oi: i64, change_oi: i64, ltp: f64, change: f64) -> Value {
        json!({
            "openInterest": oi,
            "changeinOpenInterest": change_oi,
            "totalTradedVolume": 1000,
            "lastPrice": ltp,
            "change": change,
        })
    }

    fn sample_payload() -> RawPayload {
        json!({
            "records": {
                "underlyingValue": 24_480.0,
                "data": [
                    { "strikePrice": 24_400, "CE": leg(500, 40, 150.0, 12.5), "PE": leg(900, 120, 60.0, -8.0) },
                    { "strikePrice": 24_500, "CE": leg(1_200, 80, 95.0, -3.0), "PE": leg(700, 60, 110.0, 5.0) },
                    { "strikePrice": 24_600, "CE": leg(800, -20, 50.0, -10.0), "PE": leg(300, 10, 190.0, 0.0) },
                ]
            }
        })
        .into()
    }

    fn without_timestamp(mut s: AnalyzerSnapshot) -> AnalyzerSnapshot {
        s.timestamp = None;
        s
    }

    #[test]
    fn populated_chain_has_no_errors_and_keeps_all_rows() {
        let s = analyze(&sample_payload());
        assert!(s.errors.is_empty());
        assert_eq!(s.strikes.len(), 3);
        assert!(s.timestamp.is_some());
        assert_eq!(s.strikes[0].strike, 24_400.0);
        assert_eq!(s.strikes[2].strike, 24_600.0);
    }

    #[test]
    fn derived_fields_from_sample_chain() {
        let s = analyze(&sample_payload());
        assert_eq!(s.top_resistance, Some(24_500.0));
        assert_eq!(s.top_support, Some(24_400.0));

        let summary = s.summary.unwrap();
        assert_eq!(summary.underlying, 24_480.0);
        assert_eq!(summary.total_call_change_oi, 100);
        assert_eq!(summary.total_put_change_oi, 190);
        assert_eq!(s.market_bias, MarketBias::Bullish);

        let atm = s.atm_analysis.unwrap();
        assert_eq!(atm.strike, 24_500.0);
        assert_eq!(atm.call_ltp, 95.0);
        assert_eq!(atm.put_ltp, 110.0);
        assert_eq!(atm.call_oi, 1_200);
        assert_eq!(atm.put_oi, 700);
        assert_eq!(atm.call_build_up, BuildUp::Short);
        assert_eq!(atm.put_build_up, BuildUp::Long);
    }

    #[test]
    fn empty_chain_yields_fresh_error_snapshot() {
        let s = analyze(&json!({ "records": { "data": [], "underlyingValue": 24_000.0 } }).into());
        assert_eq!(s.errors, vec![NO_STRIKE_DATA.to_string()]);
        assert!(s.strikes.is_empty());
        assert!(s.timestamp.is_some());
        assert_eq!(s.market_bias, MarketBias::Neutral);
        assert!(s.top_resistance.is_none());
        assert!(s.atm_analysis.is_none());
        assert!(s.summary.is_none());
    }

    #[test]
    fn non_object_payload_is_treated_as_empty_chain() {
        for doc in [json!(null), json!([1, 2, 3]), json!("text"), json!({ "records": 7 })] {
            let s = analyze(&doc.into());
            assert_eq!(s.errors, vec![NO_STRIKE_DATA.to_string()]);
        }
    }

    #[test]
    fn analyze_is_idempotent_apart_from_timestamp() {
        let payload = sample_payload();
        let a = without_timestamp(analyze(&payload));
        let b = without_timestamp(analyze(&payload));
        assert_eq!(a, b);
    }

    #[test]
    fn missing_legs_and_fields_default_to_zero() {
        let payload: RawPayload = json!({
            "records": {
                "underlyingValue": 100.0,
                "data": [
                    { "strikePrice": 100, "CE": { "openInterest": 10 } },
                    { "strikePrice": 110, "PE": null },
                ]
            }
        })
        .into();
        let s = analyze(&payload);
        assert_eq!(s.strikes.len(), 2);

        let first = &s.strikes[0];
        assert_eq!(first.call.oi, 10);
        assert_eq!(first.call.change_oi, 0);
        assert_eq!(first.call.volume, 0);
        assert_eq!(first.call.ltp, 0.0);
        assert_eq!(first.put, OptionLeg::default());
        assert_eq!(s.strikes[1].call, OptionLeg::default());
    }

    #[test]
    fn lenient_numeric_encodings_are_accepted() {
        let payload: RawPayload = json!({
            "records": {
                "data": [
                    { "strikePrice": "24,500", "CE": { "openInterest": 1500.0, "changeinOpenInterest": "25", "lastPrice": "12.5", "change": "bad" } },
                ]
            },
            "filtered": { "underlyingValue": 24_510.0 }
        })
        .into();
        let s = analyze(&payload);
        let row = &s.strikes[0];
        assert_eq!(row.strike, 24_500.0);
        assert_eq!(row.call.oi, 1_500);
        assert_eq!(row.call.change_oi, 25);
        assert_eq!(row.call.ltp, 12.5);
        assert_eq!(row.call.price_change, 0.0);
        assert_eq!(s.summary.unwrap().underlying, 24_510.0);
    }

    #[test]
    fn underlying_falls_back_then_defaults_to_zero() {
        let primary: RawPayload = json!({
            "records": { "underlyingValue": 1.0, "data": [{ "strikePrice": 1 }] },
            "filtered": { "underlyingValue": 2.0 }
        })
        .into();
        assert_eq!(analyze(&primary).summary.unwrap().underlying, 1.0);

        let null_primary: RawPayload = json!({
            "records": { "underlyingValue": null, "data": [{ "strikePrice": 1 }] },
            "filtered": { "underlyingValue": 2.0 }
        })
        .into();
        assert_eq!(analyze(&null_primary).summary.unwrap().underlying, 2.0);

        let neither: RawPayload = json!({ "records": { "data": [{ "strikePrice": 1 }] } }).into();
        assert_eq!(analyze(&neither).summary.unwrap().underlying, 0.0);
    }

    #[test]
    fn build_up_classification_table() {
        assert_eq!(classify_build_up(5.0, 10), BuildUp::Long);
        assert_eq!(classify_build_up(-5.0, 10), BuildUp::Short);
        assert_eq!(classify_build_up(5.0, -10), BuildUp::None);
        assert_eq!(classify_build_up(-5.0, -10), BuildUp::None);
        assert_eq!(classify_build_up(0.0, 10), BuildUp::None);
        assert_eq!(classify_build_up(5.0, 0), BuildUp::None);
    }

    #[test]
    fn bias_threshold_boundaries() {
        assert_eq!(market_bias(100, 110), MarketBias::Neutral);
        assert_eq!(market_bias(100, 111), MarketBias::Bullish);
        assert_eq!(market_bias(110, 100), MarketBias::Neutral);
        assert_eq!(market_bias(111, 100), MarketBias::Bearish);
        assert_eq!(market_bias(0, 0), MarketBias::Neutral);
    }

    #[test]
    fn resistance_picks_highest_call_oi() {
        let payload: RawPayload = json!({
            "records": {
                "underlyingValue": 105.0,
                "data": [
                    { "strikePrice": 100, "CE": { "openInterest": 50 } },
                    { "strikePrice": 110, "CE": { "openInterest": 80 } },
                ]
            }
        })
        .into();
        assert_eq!(analyze(&payload).top_resistance, Some(110.0));
    }

    #[test]
    fn ties_resolve_to_first_in_source_order() {
        let payload: RawPayload = json!({
            "records": {
                "underlyingValue": 105.0,
                "data": [
                    { "strikePrice": 100, "CE": { "openInterest": 80 }, "PE": { "openInterest": 30 } },
                    { "strikePrice": 110, "CE": { "openInterest": 80 }, "PE": { "openInterest": 30 } },
                ]
            }
        })
        .into();
        let s = analyze(&payload);
        assert_eq!(s.top_resistance, Some(100.0));
        assert_eq!(s.top_support, Some(100.0));
        // 105 is equidistant from both strikes.
        assert_eq!(s.atm_analysis.unwrap().strike, 100.0);
    }
}
