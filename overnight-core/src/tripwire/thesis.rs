//! Operator thesis and the per-instrument expectation it implies.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Directional call the operator makes on equities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Thesis {
    Long,
    Short,
}

/// What a tracked instrument is expected to do while the thesis holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    ExpectUp,
    ExpectDown,
}

impl Thesis {
    /// Expectation armed on every tracked instrument.
    ///
    /// The tracked instruments (rate proxy, dollar proxy) move against
    /// equities, so an equity LONG arms them as expect-down and SHORT as
    /// expect-up. This inversion is intentional; do not "correct" it.
    pub fn tracked_expectation(self) -> Expectation {
        match self {
            Thesis::Long => Expectation::ExpectDown,
            Thesis::Short => Expectation::ExpectUp,
        }
    }
}

impl FromStr for Thesis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Thesis::Long),
            "short" => Ok(Thesis::Short),
            other => Err(format!("unknown thesis '{other}' (expected long or short)")),
        }
    }
}

impl std::fmt::Display for Thesis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Thesis::Long => f.write_str("LONG"),
            Thesis::Short => f.write_str("SHORT"),
        }
    }
}

/// Whether `current` has crossed `opening` against `expectation`.
///
/// Pure: the session's stored flag must always equal this function applied
/// to the stored (opening_print, current_price, thesis) triple. No
/// expectation means nothing can be inverted.
pub fn is_inverted(
    opening_print: f64,
    current_price: f64,
    expectation: Option<Expectation>,
) -> bool {
    match expectation {
        Some(Expectation::ExpectDown) => current_price > opening_print,
        Some(Expectation::ExpectUp) => current_price < opening_print,
        None => false,
    }
}
