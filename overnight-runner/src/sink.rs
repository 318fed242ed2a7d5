//! Output sinks for the refresh loop.

use overnight_core::data::DataError;

use crate::dashboard::{CommandError, OperatorCommand};
use crate::view::DashboardView;

/// Receives everything the refresh loop wants shown.
pub trait DashboardSink {
    /// Called after every applied fetch, failed fetch and operator command.
    fn on_update(&mut self, view: &DashboardView);

    /// Called with the outcome of an operator command.
    fn on_command(&mut self, command: OperatorCommand, result: &Result<(), CommandError>);

    /// Called when a whole fetch failed.
    fn on_fetch_error(&mut self, error: &DataError, consecutive_failures: u32);
}

/// Prints views to stdout, as text blocks or one JSON object per line.
pub struct StdoutSink {
    pub json: bool,
}

impl DashboardSink for StdoutSink {
    fn on_update(&mut self, view: &DashboardView) {
        if self.json {
            match view.to_json() {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to serialize view"),
            }
        } else {
            println!("{view}\n");
        }
    }

    fn on_command(&mut self, command: OperatorCommand, result: &Result<(), CommandError>) {
        match result {
            Ok(()) => eprintln!("OK: {command}"),
            Err(e) => eprintln!("REJECTED: {command}: {e}"),
        }
    }

    fn on_fetch_error(&mut self, error: &DataError, consecutive_failures: u32) {
        eprintln!("FETCH FAILED ({consecutive_failures} in a row): {error}");
    }
}

/// Collects everything in memory. Used by tests and replay.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub views: Vec<DashboardView>,
    pub commands: Vec<(OperatorCommand, Result<(), CommandError>)>,
    pub fetch_errors: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_view(&self) -> Option<&DashboardView> {
        self.views.last()
    }
}

impl DashboardSink for MemorySink {
    fn on_update(&mut self, view: &DashboardView) {
        self.views.push(view.clone());
    }

    fn on_command(&mut self, command: OperatorCommand, result: &Result<(), CommandError>) {
        self.commands.push((command, result.clone()));
    }

    fn on_fetch_error(&mut self, error: &DataError, _consecutive_failures: u32) {
        self.fetch_errors.push(error.to_string());
    }
}
