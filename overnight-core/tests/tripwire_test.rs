//! Tripwire session lifecycle tests.

use chrono::DateTime;
use proptest::prelude::*;

use overnight_core::data::Universe;
use overnight_core::domain::{Quote, Snapshot};
use overnight_core::tripwire::{
    is_inverted, Expectation, SessionState, Thesis, TripwireError, TripwireSession,
};

fn session() -> TripwireSession {
    TripwireSession::new(Universe::default_overnight().tracked_instruments())
}

fn snap(rate: Option<f64>, dollar: Option<f64>) -> Snapshot {
    let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let mut s = Snapshot::new();
    if let Some(p) = rate {
        s.insert(Quote::new("^TNX", p, 0.0, 0.0, ts));
    }
    if let Some(p) = dollar {
        s.insert(Quote::new("DX-Y.NYB", p, 0.0, 0.0, ts));
    }
    s
}

#[test]
fn case_c_delta_is_measured_from_the_locked_baseline() {
    let mut s = session();
    s.lock(&snap(Some(4.250), Some(103.20))).unwrap();
    s.set_thesis(Thesis::Long).unwrap();

    let out = s.refresh(&snap(Some(4.300), None)).unwrap();
    let rate = s.instrument("^TNX").unwrap();
    assert!((rate.delta().unwrap() - 0.050).abs() < 1e-9);
    assert!(rate.inverted());
    assert!(out.session_inverted);

    let out = s.refresh(&snap(Some(4.200), None)).unwrap();
    let rate = s.instrument("^TNX").unwrap();
    assert!((rate.delta().unwrap() + 0.050).abs() < 1e-9);
    assert!(!rate.inverted());
    assert!(!out.session_inverted);
    assert_eq!(rate.opening_print(), Some(4.250));
}

#[test]
fn lock_is_all_or_nothing() {
    for partial in [snap(Some(4.25), None), snap(None, Some(103.2)), snap(None, None)] {
        let mut s = session();
        let err = s.lock(&partial).unwrap_err();
        assert!(matches!(err, TripwireError::MissingInstruments { .. }));
        assert_eq!(s.state(), SessionState::Unlocked);
        assert!(s.instruments().iter().all(|t| t.opening_print().is_none()));
    }
}

#[test]
fn lock_rejects_malformed_quote() {
    let mut s = session();
    let err = s.lock(&snap(Some(f64::NAN), Some(103.2))).unwrap_err();
    assert_eq!(
        err,
        TripwireError::MissingInstruments {
            symbols: vec!["^TNX".to_string()]
        }
    );
    assert_eq!(s.state(), SessionState::Unlocked);
}

#[test]
fn long_thesis_arms_both_instruments_expect_down() {
    let mut s = session();
    s.lock(&snap(Some(4.25), Some(103.2))).unwrap();
    s.set_thesis(Thesis::Long).unwrap();
    assert_eq!(s.state(), SessionState::Armed);
    assert!(s
        .instruments()
        .iter()
        .all(|t| t.thesis() == Some(Expectation::ExpectDown)));

    // Dollar rising against a long equity thesis trips the wire.
    s.refresh(&snap(None, Some(103.5))).unwrap();
    assert!(s.instrument("DX-Y.NYB").unwrap().inverted());
    assert!(!s.instrument("^TNX").unwrap().inverted());
    assert!(s.session_inverted());
}

#[test]
fn short_thesis_arms_expect_up() {
    let mut s = session();
    s.lock(&snap(Some(4.25), Some(103.2))).unwrap();
    s.set_thesis(Thesis::Short).unwrap();
    s.refresh(&snap(Some(4.20), Some(103.3))).unwrap();
    assert!(s.instrument("^TNX").unwrap().inverted());
    assert!(!s.instrument("DX-Y.NYB").unwrap().inverted());
}

#[test]
fn refresh_with_empty_snapshot_changes_nothing() {
    let mut s = session();
    s.lock(&snap(Some(4.25), Some(103.2))).unwrap();
    s.set_thesis(Thesis::Long).unwrap();
    s.refresh(&snap(Some(4.30), Some(103.0))).unwrap();
    let before = s.clone();
    let out = s.refresh(&Snapshot::new()).unwrap();
    assert_eq!(s, before);
    assert_eq!(out.stale.len(), 2);
    assert!(out.updated.is_empty());
}

#[test]
fn invalid_transition_names_operation_and_state() {
    let mut s = session();
    s.lock(&snap(Some(4.25), Some(103.2))).unwrap();
    let err = s.lock(&snap(Some(4.25), Some(103.2))).unwrap_err();
    assert_eq!(err.to_string(), "cannot lock while session is LOCKED");
}

// ── Properties ───────────────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..200.0_f64).prop_map(|p| (p * 1000.0).round() / 1000.0)
}

fn arb_thesis() -> impl Strategy<Value = Option<Thesis>> {
    prop_oneof![Just(None), Just(Some(Thesis::Long)), Just(Some(Thesis::Short))]
}

proptest! {
    /// The stored inverted flag always equals the pure function of the
    /// stored (opening, current, thesis) triple.
    #[test]
    fn inverted_is_recomputable(
        rate0 in arb_price(),
        dollar0 in arb_price(),
        thesis in arb_thesis(),
        ticks in prop::collection::vec(
            (prop::option::of(arb_price()), prop::option::of(arb_price())),
            0..20,
        ),
    ) {
        let mut s = session();
        s.lock(&snap(Some(rate0), Some(dollar0))).unwrap();
        if let Some(t) = thesis {
            s.set_thesis(t).unwrap();
        }
        for (rate, dollar) in ticks {
            s.refresh(&snap(rate, dollar)).unwrap();
            for tw in s.instruments() {
                let expected = is_inverted(
                    tw.opening_print().unwrap(),
                    tw.current_price().unwrap(),
                    tw.thesis(),
                );
                prop_assert_eq!(tw.inverted(), expected);
                let delta = tw.current_price().unwrap() - tw.opening_print().unwrap();
                prop_assert!((tw.delta().unwrap() - delta).abs() < 1e-9);
            }
            prop_assert_eq!(
                s.session_inverted(),
                s.instruments().iter().any(|t| t.inverted())
            );
        }
    }

    /// Opening prints never move after lock, whatever the refreshes do.
    #[test]
    fn baseline_is_stable(
        rate0 in arb_price(),
        dollar0 in arb_price(),
        ticks in prop::collection::vec((arb_price(), arb_price()), 1..10),
    ) {
        let mut s = session();
        s.lock(&snap(Some(rate0), Some(dollar0))).unwrap();
        s.set_thesis(Thesis::Long).unwrap();
        for (rate, dollar) in ticks {
            s.refresh(&snap(Some(rate), Some(dollar))).unwrap();
        }
        prop_assert_eq!(s.instrument("^TNX").unwrap().opening_print(), Some(rate0));
        prop_assert_eq!(s.instrument("DX-Y.NYB").unwrap().opening_print(), Some(dollar0));
    }
}
