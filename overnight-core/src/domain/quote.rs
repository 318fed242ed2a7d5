//! One price reading for one instrument.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Symbol;

/// Moves smaller than this (in percent) read as flat.
pub const FLAT_THRESHOLD_PCT: f64 = 0.1;

/// Sign of a quote's move after the noise threshold is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    pub fn from_change_percent(change_percent: f64) -> Self {
        if change_percent.abs() < FLAT_THRESHOLD_PCT {
            Direction::Flat
        } else if change_percent > 0.0 {
            Direction::Up
        } else if change_percent < 0.0 {
            Direction::Down
        } else {
            // NaN
            Direction::Flat
        }
    }
}

/// A single reading at a point in time.
///
/// `change` is the absolute move from the previous close, `change_percent`
/// the same move in percent (1.2 means +1.2%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        symbol: impl Into<Symbol>,
        price: f64,
        change: f64,
        change_percent: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change,
            change_percent,
            observed_at,
        }
    }

    /// Build a quote from the current price and the previous close.
    pub fn from_previous_close(
        symbol: impl Into<Symbol>,
        price: f64,
        previous_close: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let change = price - previous_close;
        let change_percent = if previous_close != 0.0 {
            change / previous_close * 100.0
        } else {
            f64::NAN
        };
        Self::new(symbol, price, change, change_percent, observed_at)
    }

    /// A quote with any non-finite numeric field is malformed and must be
    /// treated as absent, never as zero.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.change.is_finite() && self.change_percent.is_finite()
    }

    pub fn direction(&self) -> Direction {
        Direction::from_change_percent(self.change_percent)
    }
}
