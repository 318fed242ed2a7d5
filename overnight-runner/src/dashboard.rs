//! Dashboard state: the classifier, the owned tripwire session and the last
//! good data, mutated only from the refresh loop thread.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use overnight_core::classifier::{ScenarioClassifier, ScenarioResult};
use overnight_core::data::{DataError, FetchResult, Universe, UniverseError};
use overnight_core::domain::Snapshot;
use overnight_core::tripwire::{SessionState, Thesis, TripwireError, TripwireSession};

use crate::view::{DashboardView, SessionView};

/// An operator-triggered session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Lock,
    SetThesis(Thesis),
    Reset,
}

impl FromStr for OperatorCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lock" => Ok(OperatorCommand::Lock),
            "long" => Ok(OperatorCommand::SetThesis(Thesis::Long)),
            "short" => Ok(OperatorCommand::SetThesis(Thesis::Short)),
            "reset" => Ok(OperatorCommand::Reset),
            other => Err(format!(
                "unknown command '{other}' (expected lock, long, short or reset)"
            )),
        }
    }
}

impl fmt::Display for OperatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorCommand::Lock => f.write_str("lock"),
            OperatorCommand::SetThesis(t) => write!(f, "set thesis {t}"),
            OperatorCommand::Reset => f.write_str("reset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Tripwire(#[from] TripwireError),

    #[error("cannot lock: no snapshot has been fetched yet")]
    NoSnapshot,
}

/// Startup behavior for the tripwire session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Lock on the first snapshot that carries every tracked instrument.
    pub auto_lock: bool,
    /// Thesis to arm right after an automatic lock.
    pub thesis: Option<Thesis>,
}

/// What applying one fetch did to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    pub scenario: ScenarioResult,
    pub auto_locked: bool,
    pub session_inverted: bool,
}

pub struct Dashboard {
    classifier: ScenarioClassifier,
    session: TripwireSession,
    options: SessionOptions,
    scenario: Option<ScenarioResult>,
    last_snapshot: Option<Snapshot>,
    last_update: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    last_error: Option<String>,
}

impl Dashboard {
    pub fn new(universe: &Universe, options: SessionOptions) -> Result<Self, UniverseError> {
        universe.validate()?;
        Ok(Self {
            classifier: ScenarioClassifier::new(universe)?,
            session: TripwireSession::new(universe.tracked_instruments()),
            options,
            scenario: None,
            last_snapshot: None,
            last_update: None,
            consecutive_failures: 0,
            last_error: None,
        })
    }

    pub fn session(&self) -> &TripwireSession {
        &self.session
    }

    pub fn scenario(&self) -> Option<&ScenarioResult> {
        self.scenario.as_ref()
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Message of the most recent failed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Classify a fresh snapshot and push it through the tripwires.
    ///
    /// Classification and the session update finish before this returns,
    /// so the next fetch always sees the state this one produced.
    pub fn apply_fetch(&mut self, fetch: FetchResult, now: DateTime<Utc>) -> TickSummary {
        if !fetch.missing.is_empty() {
            tracing::debug!(missing = ?fetch.missing, "partial snapshot");
        }

        let scenario = self.classifier.classify(&fetch.snapshot);
        if self.scenario.as_ref().map(|s| s.scenario_id) != Some(scenario.scenario_id) {
            tracing::info!(
                scenario = scenario.scenario_id.id(),
                confidence = %scenario.confidence,
                "scenario changed"
            );
        }

        let mut auto_locked = false;
        match self.session.state() {
            SessionState::Unlocked if self.options.auto_lock => {
                auto_locked = self.try_auto_lock(&fetch.snapshot);
            }
            SessionState::Unlocked => {}
            SessionState::Locked | SessionState::Armed => {
                match self.session.refresh(&fetch.snapshot) {
                    Ok(outcome) => {
                        for symbol in &outcome.newly_inverted {
                            tracing::warn!(%symbol, "tripwire inverted");
                        }
                        for symbol in &outcome.cleared {
                            tracing::info!(%symbol, "tripwire cleared");
                        }
                        if !outcome.stale.is_empty() {
                            tracing::debug!(
                                stale = ?outcome.stale,
                                "tripwire instruments kept previous values"
                            );
                        }
                    }
                    // Refresh only rejects UNLOCKED, which the match excludes.
                    Err(e) => tracing::debug!(error = %e, "refresh skipped"),
                }
            }
        }

        self.scenario = Some(scenario.clone());
        self.last_snapshot = Some(fetch.snapshot);
        self.last_update = Some(now);
        self.consecutive_failures = 0;
        self.last_error = None;

        TickSummary {
            scenario,
            auto_locked,
            session_inverted: self.session.session_inverted(),
        }
    }

    fn try_auto_lock(&mut self, snapshot: &Snapshot) -> bool {
        match self.session.lock(snapshot) {
            Ok(()) => {
                tracing::info!("tripwires auto-locked");
                if let Some(thesis) = self.options.thesis {
                    if let Err(e) = self.session.set_thesis(thesis) {
                        tracing::warn!(error = %e, "could not arm thesis after auto-lock");
                    } else {
                        tracing::info!(%thesis, "tripwires armed");
                    }
                }
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "auto-lock waiting for a complete snapshot");
                false
            }
        }
    }

    /// Record a fetch that produced nothing. The last good state is kept.
    pub fn record_failure(&mut self, error: &DataError) {
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
        tracing::warn!(
            error = %error,
            consecutive = self.consecutive_failures,
            "fetch failed, keeping last good state"
        );
    }

    /// Run an operator transition. Rejections leave the session untouched.
    pub fn apply_command(&mut self, command: OperatorCommand) -> Result<(), CommandError> {
        let result = match command {
            OperatorCommand::Lock => match self.last_snapshot.as_ref() {
                Some(snapshot) => self.session.lock(snapshot).map_err(CommandError::from),
                None => Err(CommandError::NoSnapshot),
            },
            OperatorCommand::SetThesis(thesis) => {
                self.session.set_thesis(thesis).map_err(CommandError::from)
            }
            OperatorCommand::Reset => {
                self.session.reset();
                Ok(())
            }
        };

        match &result {
            Ok(()) => tracing::info!(
                %command,
                state = %self.session.state(),
                "operator command applied"
            ),
            Err(e) => tracing::info!(%command, error = %e, "operator command rejected"),
        }
        result
    }

    pub fn view(&self, now: DateTime<Utc>) -> DashboardView {
        DashboardView {
            scenario: self.scenario.clone(),
            session: SessionView::new(&self.session, self.last_snapshot.as_ref()),
            last_update: self.last_update,
            staleness_secs: self
                .last_update
                .map(|at| (now - at).num_seconds().max(0)),
            consecutive_failures: self.consecutive_failures,
            last_error: self.last_error.clone(),
        }
    }
}
