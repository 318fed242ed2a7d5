//! Tripwire session state machine.
//!
//! ```text
//! UNLOCKED --lock(snapshot)--> LOCKED --set_thesis(dir)--> ARMED
//!     ^                                                      |
//!     +-------------------------- reset() -------------------+
//! ```
//!
//! `lock` captures every tracked instrument's opening print at once or
//! nothing at all. `refresh` moves current prices and recomputes inversion,
//! leaving instruments absent from the snapshot untouched. The session stays
//! ARMED however often inversion fires or clears.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::thesis::{is_inverted, Expectation, Thesis};
use crate::domain::{Instrument, Snapshot, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Unlocked,
    Locked,
    Armed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unlocked => f.write_str("UNLOCKED"),
            SessionState::Locked => f.write_str("LOCKED"),
            SessionState::Armed => f.write_str("ARMED"),
        }
    }
}

/// Operator-facing session operations, named in transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Lock,
    SetThesis,
    Refresh,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Lock => f.write_str("lock"),
            Operation::SetThesis => f.write_str("set_thesis"),
            Operation::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripwireError {
    #[error("cannot {operation} while session is {state}")]
    InvalidTransition {
        operation: Operation,
        state: SessionState,
    },

    #[error("cannot lock: no valid quote for {}", .symbols.join(", "))]
    MissingInstruments { symbols: Vec<Symbol> },
}

/// One monitored instrument and its baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripwireInstrument {
    instrument: Instrument,
    opening_print: Option<f64>,
    current_price: Option<f64>,
    thesis: Option<Expectation>,
    delta: Option<f64>,
    inverted: bool,
    last_update: Option<DateTime<Utc>>,
}

impl TripwireInstrument {
    fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            opening_print: None,
            current_price: None,
            thesis: None,
            delta: None,
            inverted: false,
            last_update: None,
        }
    }

    fn clear(&mut self) {
        *self = Self::new(self.instrument.clone());
    }

    fn recompute(&mut self) {
        if let (Some(opening), Some(current)) = (self.opening_print, self.current_price) {
            self.delta = Some(current - opening);
            self.inverted = is_inverted(opening, current, self.thesis);
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn symbol(&self) -> &str {
        &self.instrument.symbol
    }

    pub fn opening_print(&self) -> Option<f64> {
        self.opening_print
    }

    pub fn current_price(&self) -> Option<f64> {
        self.current_price
    }

    pub fn thesis(&self) -> Option<Expectation> {
        self.thesis
    }

    /// current_price − opening_print, always measured from the locked baseline.
    pub fn delta(&self) -> Option<f64> {
        self.delta
    }

    pub fn inverted(&self) -> bool {
        self.inverted
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

/// What one refresh did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    /// Instruments whose current price moved to the new snapshot.
    pub updated: Vec<Symbol>,
    /// Instruments absent from the snapshot, left at their previous values.
    pub stale: Vec<Symbol>,
    /// Instruments that went from not inverted to inverted on this refresh.
    pub newly_inverted: Vec<Symbol>,
    /// Instruments that recrossed back to the thesis side on this refresh.
    pub cleared: Vec<Symbol>,
    pub session_inverted: bool,
}

/// An owned monitoring session over N tracked instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripwireSession {
    instruments: Vec<TripwireInstrument>,
    state: SessionState,
    equity_thesis: Option<Thesis>,
}

impl TripwireSession {
    pub fn new(tracked: Vec<Instrument>) -> Self {
        Self {
            instruments: tracked.into_iter().map(TripwireInstrument::new).collect(),
            state: SessionState::Unlocked,
            equity_thesis: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The equity-facing thesis the operator set, if armed.
    pub fn equity_thesis(&self) -> Option<Thesis> {
        self.equity_thesis
    }

    pub fn instruments(&self) -> &[TripwireInstrument] {
        &self.instruments
    }

    pub fn instrument(&self, symbol: &str) -> Option<&TripwireInstrument> {
        self.instruments.iter().find(|t| t.symbol() == symbol)
    }

    pub fn tracked_symbols(&self) -> Vec<&str> {
        self.instruments.iter().map(|t| t.symbol()).collect()
    }

    /// OR of per-instrument inversion. Recomputed on every refresh, not sticky.
    pub fn session_inverted(&self) -> bool {
        self.instruments.iter().any(|t| t.inverted)
    }

    /// Capture the baseline for every tracked instrument at once.
    ///
    /// Fails closed: if any tracked instrument lacks a valid quote the
    /// session is left UNLOCKED with nothing captured.
    pub fn lock(&mut self, snapshot: &Snapshot) -> Result<(), TripwireError> {
        if self.state != SessionState::Unlocked {
            return Err(TripwireError::InvalidTransition {
                operation: Operation::Lock,
                state: self.state,
            });
        }

        let missing = snapshot.missing(self.tracked_symbols());
        if !missing.is_empty() {
            return Err(TripwireError::MissingInstruments { symbols: missing });
        }

        for tw in &mut self.instruments {
            // Presence was checked above for every tracked symbol.
            if let Some(quote) = snapshot.get(&tw.instrument.symbol) {
                tw.opening_print = Some(quote.price);
                tw.current_price = Some(quote.price);
                tw.delta = Some(0.0);
                tw.inverted = false;
                tw.last_update = Some(quote.observed_at);
            }
        }
        self.state = SessionState::Locked;
        Ok(())
    }

    /// Arm the session with an equity thesis. Only valid from LOCKED.
    pub fn set_thesis(&mut self, thesis: Thesis) -> Result<(), TripwireError> {
        if self.state != SessionState::Locked {
            return Err(TripwireError::InvalidTransition {
                operation: Operation::SetThesis,
                state: self.state,
            });
        }

        let expectation = thesis.tracked_expectation();
        for tw in &mut self.instruments {
            tw.thesis = Some(expectation);
            tw.recompute();
        }
        self.equity_thesis = Some(thesis);
        self.state = SessionState::Armed;
        Ok(())
    }

    /// Apply a new snapshot. Valid from LOCKED or ARMED.
    ///
    /// Missing instruments are reported as stale, never an error.
    pub fn refresh(&mut self, snapshot: &Snapshot) -> Result<RefreshOutcome, TripwireError> {
        if self.state == SessionState::Unlocked {
            return Err(TripwireError::InvalidTransition {
                operation: Operation::Refresh,
                state: self.state,
            });
        }

        let mut outcome = RefreshOutcome::default();
        for tw in &mut self.instruments {
            let symbol = tw.instrument.symbol.clone();
            let Some(quote) = snapshot.get(&symbol) else {
                outcome.stale.push(symbol);
                continue;
            };
            let was_inverted = tw.inverted;
            tw.current_price = Some(quote.price);
            tw.last_update = Some(quote.observed_at);
            tw.recompute();

            match (was_inverted, tw.inverted) {
                (false, true) => outcome.newly_inverted.push(symbol.clone()),
                (true, false) => outcome.cleared.push(symbol.clone()),
                _ => {}
            }
            outcome.updated.push(symbol);
        }
        outcome.session_inverted = self.session_inverted();
        Ok(outcome)
    }

    /// Back to UNLOCKED from any state, clearing every per-instrument field.
    pub fn reset(&mut self) {
        for tw in &mut self.instruments {
            tw.clear();
        }
        self.equity_thesis = None;
        self.state = SessionState::Unlocked;
    }
}
