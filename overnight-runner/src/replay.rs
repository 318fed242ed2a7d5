//! Offline re-derivation of a session from a replay tape.
//!
//! The first tick becomes the baseline: it is classified, locked and armed
//! with the operator's thesis. Every later tick is applied as an ordinary
//! fetch. Ticks carry their own timestamps, so staleness in the views is
//! measured on the tape's clock rather than the wall clock.

use chrono::{DateTime, Utc};
use thiserror::Error;

use overnight_core::data::{DataError, DataSource, FetchResult, ReplayTape, Universe, UniverseError};
use overnight_core::tripwire::Thesis;

use crate::dashboard::{CommandError, Dashboard, OperatorCommand, SessionOptions};
use crate::view::DashboardView;

#[derive(Debug, Error)]
pub enum ReplayRunError {
    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("first replay tick cannot open the session: {0}")]
    Baseline(#[from] CommandError),

    #[error("replay tape has no ticks")]
    Empty,
}

/// Replay `tape` against a fresh dashboard and collect one view per tick.
pub fn replay_tape(
    universe: &Universe,
    tape: &ReplayTape,
    thesis: Thesis,
) -> Result<Vec<DashboardView>, ReplayRunError> {
    let (first, rest) = tape.snapshots().split_first().ok_or(ReplayRunError::Empty)?;
    let mut dashboard = Dashboard::new(universe, SessionOptions::default())?;
    let symbols = universe.all_symbols();
    let mut clock = first.captured_at().unwrap_or(DateTime::UNIX_EPOCH);

    let as_fetch = |snapshot: &overnight_core::domain::Snapshot| FetchResult {
        missing: snapshot.missing(symbols.iter().map(String::as_str)),
        snapshot: snapshot.clone(),
        source: DataSource::Replay,
    };

    dashboard.apply_fetch(as_fetch(first), clock);
    dashboard.apply_command(OperatorCommand::Lock)?;
    dashboard.apply_command(OperatorCommand::SetThesis(thesis))?;

    let mut views = Vec::with_capacity(tape.len());
    views.push(dashboard.view(clock));

    for snapshot in rest {
        clock = advance(clock, snapshot.captured_at());
        if snapshot.is_empty() {
            dashboard.record_failure(&DataError::NoQuotes {
                requested: symbols.len(),
            });
        } else {
            dashboard.apply_fetch(as_fetch(snapshot), clock);
        }
        views.push(dashboard.view(clock));
    }

    tracing::info!(ticks = views.len(), %thesis, "replay complete");
    Ok(views)
}

fn advance(clock: DateTime<Utc>, observed: Option<DateTime<Utc>>) -> DateTime<Utc> {
    observed.map_or(clock, |t| t.max(clock))
}
