//! Presentation-layer view of the dashboard.
//!
//! Plain serializable data rebuilt from the dashboard after every event.
//! Nothing here feeds back into classification or the tripwires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use overnight_core::classifier::ScenarioResult;
use overnight_core::domain::{Direction, Snapshot, Symbol};
use overnight_core::tripwire::{
    Expectation, SessionState, Thesis, TripwireInstrument, TripwireSession,
};

/// One tripwire line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripwireRow {
    pub symbol: Symbol,
    pub label: String,
    pub opening_print: Option<f64>,
    pub current_price: Option<f64>,
    pub delta: Option<f64>,
    pub inverted: bool,
    pub thesis: Option<Expectation>,
    /// Day move of the latest quote, after the flat-noise threshold.
    pub direction: Option<Direction>,
    pub last_update: Option<DateTime<Utc>>,
}

impl TripwireRow {
    fn new(tw: &TripwireInstrument, latest: Option<&Snapshot>) -> Self {
        let direction = latest
            .and_then(|s| s.get(tw.symbol()))
            .map(|q| q.direction());
        Self {
            symbol: tw.symbol().to_string(),
            label: tw.instrument().display_label.clone(),
            opening_print: tw.opening_print(),
            current_price: tw.current_price(),
            delta: tw.delta(),
            inverted: tw.inverted(),
            thesis: tw.thesis(),
            direction,
            last_update: tw.last_update(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub state: SessionState,
    pub equity_thesis: Option<Thesis>,
    pub session_inverted: bool,
    pub rows: Vec<TripwireRow>,
}

impl SessionView {
    pub fn new(session: &TripwireSession, latest: Option<&Snapshot>) -> Self {
        Self {
            state: session.state(),
            equity_thesis: session.equity_thesis(),
            session_inverted: session.session_inverted(),
            rows: session
                .instruments()
                .iter()
                .map(|tw| TripwireRow::new(tw, latest))
                .collect(),
        }
    }
}

/// Everything the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    /// Scenario from the last successful fetch. `None` before the first one.
    pub scenario: Option<ScenarioResult>,
    pub session: SessionView,
    /// Time of the last successful fetch.
    pub last_update: Option<DateTime<Utc>>,
    /// Seconds since `last_update`, grows while fetches keep failing.
    pub staleness_secs: Option<i64>,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DashboardView {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn price(p: Option<f64>) -> String {
    p.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scenario {
            Some(s) => {
                writeln!(f, "Scenario: {} ({})", s.name, s.confidence)?;
                writeln!(f, "  {}", s.policy_text)?;
                if !s.missing_symbols.is_empty() {
                    writeln!(f, "  missing: {}", s.missing_symbols.join(", "))?;
                }
            }
            None => writeln!(f, "Scenario: waiting for first snapshot")?,
        }

        let thesis = self
            .session
            .equity_thesis
            .map_or_else(|| "-".to_string(), |t| t.to_string());
        write!(f, "Tripwires: {} thesis={thesis}", self.session.state)?;
        if self.session.session_inverted {
            write!(f, "  ** INVERTED **")?;
        }
        writeln!(f)?;

        for row in &self.session.rows {
            let delta = row
                .delta
                .map_or_else(|| "-".to_string(), |d| format!("{d:+.3}"));
            writeln!(
                f,
                "  {:<10} {:<14} open={:>9} now={:>9} delta={:>7}{}",
                row.symbol,
                row.label,
                price(row.opening_print),
                price(row.current_price),
                delta,
                if row.inverted { "  INVERTED" } else { "" },
            )?;
        }

        match (self.last_update, self.staleness_secs) {
            (Some(at), Some(age)) => write!(
                f,
                "Last update: {} ({age}s ago)",
                at.format("%H:%M:%S UTC")
            )?,
            _ => write!(f, "Last update: never")?,
        }
        if self.consecutive_failures > 0 {
            write!(f, ", {} failed fetch(es)", self.consecutive_failures)?;
        }
        Ok(())
    }
}
