//! Classifier behavior over whole snapshots.
//!
//! Covers the concrete market cases, first-rule-wins priority, the
//! insufficient-data sentinel, and determinism under proptest.

use chrono::DateTime;
use proptest::prelude::*;

use overnight_core::classifier::{Scenario, ScenarioClassifier};
use overnight_core::data::Universe;
use overnight_core::domain::{Quote, Snapshot};

const SYMBOLS: [&str; 5] = ["^N225", "^HSI", "^STOXX50E", "^TNX", "DX-Y.NYB"];

// ── Helpers ──────────────────────────────────────────────────────────

/// Snapshot with the given percent moves in role order. The absolute change
/// carries the same sign as the percent so rate direction agrees with it.
fn snapshot(changes: [f64; 5]) -> Snapshot {
    let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    SYMBOLS
        .iter()
        .zip(changes)
        .map(|(s, pct)| Quote::new(*s, 100.0, pct / 100.0, pct, ts))
        .collect()
}

fn classifier() -> ScenarioClassifier {
    ScenarioClassifier::new(&Universe::default_overnight()).unwrap()
}

// ── Concrete cases ───────────────────────────────────────────────────

#[test]
fn case_a_is_green_light_four_of_four() {
    let result = classifier().classify(&snapshot([1.2, 0.8, 0.9, -0.3, -0.4]));
    assert_eq!(result.scenario_id, Scenario::GreenLight);
    assert_eq!(result.confidence.to_string(), "4/4");
    assert_eq!(result.name, "Green Light");
}

#[test]
fn case_b_is_flight_to_safety_four_of_four() {
    // Asia is down through the tech proxy alone.
    let result = classifier().classify(&snapshot([-0.5, 0.1, -0.6, -0.2, 0.5]));
    assert_eq!(result.scenario_id, Scenario::FlightToSafety);
    assert_eq!(result.confidence.to_string(), "4/4");
    assert!(result.matched_signals.contains(&"asia_down".to_string()));
    assert!(result.matched_signals.contains(&"currency_up".to_string()));
}

#[test]
fn dead_cat_wins_over_yield_choke() {
    // rates spiking, currency up, Europe flat, Asia down: both rules match.
    let snap = snapshot([-0.5, 0.2, 0.1, 1.5, 0.3]);
    let result = classifier().classify(&snap);
    assert_eq!(result.scenario_id, Scenario::DeadCat);
    assert_eq!(result.confidence.to_string(), "4/4");
    assert!(result.scenario_id.is_no_trade());
}

#[test]
fn yield_choke_when_asia_is_not_down() {
    let result = classifier().classify(&snapshot([0.4, 0.2, 0.1, 1.5, 0.3]));
    assert_eq!(result.scenario_id, Scenario::YieldChoke);
    assert_eq!(result.confidence.to_string(), "3/4");
}

#[test]
fn nothing_matching_falls_back_to_mixed_chop() {
    // Asia up, Europe down, rates flat, dollar down.
    let result = classifier().classify(&snapshot([0.5, 0.5, -0.6, 0.0, -0.2]));
    assert_eq!(result.scenario_id, Scenario::MixedChop);
    assert_eq!(result.confidence.to_string(), "2/4");
}

// ── Sentinel ─────────────────────────────────────────────────────────

#[test]
fn removing_any_required_quote_forces_the_sentinel() {
    let green = snapshot([1.2, 0.8, 0.9, -0.3, -0.4]);
    let classifier = classifier();
    assert_eq!(classifier.classify(&green).scenario_id, Scenario::GreenLight);

    for symbol in SYMBOLS {
        let mut partial = green.clone();
        partial.remove(symbol);
        let result = classifier.classify(&partial);
        assert!(result.is_insufficient(), "removing {symbol} kept {:?}", result.scenario_id);
        assert_eq!(result.missing_symbols, vec![symbol.to_string()]);
        assert_eq!(result.confidence.to_string(), "0/4");
    }
}

#[test]
fn empty_snapshot_lists_every_required_symbol() {
    let result = classifier().classify(&Snapshot::new());
    assert!(result.is_insufficient());
    assert_eq!(result.missing_symbols.len(), 5);
}

#[test]
fn catalogue_lists_every_scenario_in_priority_order() {
    let all = Scenario::all();
    assert_eq!(all[0], Scenario::DeadCat);
    assert_eq!(&all[..6], &Scenario::PRIORITY[..]);
    assert_eq!(all[6], Scenario::MixedChop);
    assert_eq!(all[7], Scenario::InsufficientData);
    assert!(all.iter().all(|s| !s.policy_text().is_empty()));
}

// ── Properties ───────────────────────────────────────────────────────

fn arb_change() -> impl Strategy<Value = f64> {
    (-3.0..3.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_changes() -> impl Strategy<Value = [f64; 5]> {
    [arb_change(), arb_change(), arb_change(), arb_change(), arb_change()]
}

proptest! {
    /// Identical input always classifies identically.
    #[test]
    fn classify_is_deterministic(changes in arb_changes()) {
        let snap = snapshot(changes);
        let c = classifier();
        prop_assert_eq!(c.classify(&snap), c.classify(&snap.clone()));
    }

    /// A complete snapshot never yields the sentinel; an incomplete one always does.
    #[test]
    fn sentinel_iff_quote_missing(changes in arb_changes(), drop in 0usize..6) {
        let mut snap = snapshot(changes);
        if drop < 5 {
            snap.remove(SYMBOLS[drop]);
        }
        let result = classifier().classify(&snap);
        prop_assert_eq!(result.is_insufficient(), drop < 5);
    }

    /// Confidence never exceeds the scale, and Tech Divergence never exceeds 3.
    #[test]
    fn confidence_stays_in_range(changes in arb_changes()) {
        let result = classifier().classify(&snapshot(changes));
        prop_assert!(result.confidence.satisfied() <= 4);
        if result.scenario_id == Scenario::TechDivergence {
            prop_assert!(result.confidence.satisfied() <= 3);
        }
    }
}
