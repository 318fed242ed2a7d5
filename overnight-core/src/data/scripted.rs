//! Scripted quote provider for tests and offline runs.
//!
//! Plays back a queue of canned responses, one per `fetch` call. Once the
//! queue is down to its last entry that entry repeats forever, so a provider
//! built from a single snapshot behaves like a fixed feed.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::provider::{DataError, DataSource, FetchResult, QuoteProvider};
use crate::domain::{Snapshot, Symbol};

/// One canned response.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Snapshot(Snapshot),
    Fail(DataError),
}

pub struct ScriptedProvider {
    steps: Mutex<VecDeque<ScriptStep>>,
    latency: Duration,
    source: DataSource,
}

impl ScriptedProvider {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            latency: Duration::ZERO,
            source: DataSource::Scripted,
        }
    }

    /// Always answer with `snapshot`.
    pub fn fixed(snapshot: Snapshot) -> Self {
        Self::new([ScriptStep::Snapshot(snapshot)])
    }

    /// Always fail with `error`.
    pub fn failing(error: DataError) -> Self {
        Self::new([ScriptStep::Fail(error)])
    }

    /// Sleep this long inside every `fetch`, to simulate a slow round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Tag fetched results with a different source.
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    fn next_step(&self) -> Option<ScriptStep> {
        let mut steps = self.steps.lock().unwrap_or_else(|p| p.into_inner());
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

impl QuoteProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, symbols: &[Symbol]) -> Result<FetchResult, DataError> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let snapshot = match self.next_step() {
            Some(ScriptStep::Snapshot(s)) => s,
            Some(ScriptStep::Fail(e)) => return Err(e),
            None => {
                return Err(DataError::NoQuotes {
                    requested: symbols.len(),
                })
            }
        };

        // Only hand back what was asked for.
        let snapshot: Snapshot = snapshot
            .quotes()
            .filter(|q| symbols.contains(&q.symbol))
            .cloned()
            .collect();
        if snapshot.is_empty() {
            return Err(DataError::NoQuotes {
                requested: symbols.len(),
            });
        }
        let missing = snapshot.missing(symbols.iter().map(String::as_str));

        Ok(FetchResult {
            snapshot,
            missing,
            source: self.source,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quote;
    use chrono::DateTime;

    fn snap(pairs: &[(&str, f64)]) -> Snapshot {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        pairs
            .iter()
            .map(|(s, p)| Quote::new(*s, *p, 0.0, 0.0, ts))
            .collect()
    }

    fn symbols(list: &[&str]) -> Vec<Symbol> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plays_steps_in_order_then_repeats_last() {
        let p = ScriptedProvider::new([
            ScriptStep::Snapshot(snap(&[("^TNX", 4.25)])),
            ScriptStep::Fail(DataError::NetworkUnreachable("down".into())),
            ScriptStep::Snapshot(snap(&[("^TNX", 4.30)])),
        ]);
        let want = symbols(&["^TNX"]);
        assert_eq!(p.fetch(&want).unwrap().snapshot.get("^TNX").unwrap().price, 4.25);
        assert!(p.fetch(&want).is_err());
        assert_eq!(p.fetch(&want).unwrap().snapshot.get("^TNX").unwrap().price, 4.30);
        assert_eq!(p.fetch(&want).unwrap().snapshot.get("^TNX").unwrap().price, 4.30);
    }

    #[test]
    fn reports_unserved_symbols_as_missing() {
        let p = ScriptedProvider::fixed(snap(&[("^TNX", 4.25), ("^N225", 38000.0)]));
        let result = p.fetch(&symbols(&["^TNX", "DX-Y.NYB"])).unwrap();
        assert_eq!(result.missing, vec!["DX-Y.NYB".to_string()]);
        assert!(!result.snapshot.contains("^N225"));
        assert_eq!(result.source, DataSource::Scripted);
    }

    #[test]
    fn nothing_usable_is_an_error() {
        let p = ScriptedProvider::fixed(snap(&[("^N225", 38000.0)]));
        let err = p.fetch(&symbols(&["^TNX"])).unwrap_err();
        assert!(matches!(err, DataError::NoQuotes { requested: 1 }));
    }

    #[test]
    fn empty_script_fails() {
        let p = ScriptedProvider::new(Vec::new());
        assert!(p.fetch(&symbols(&["^TNX"])).is_err());
    }
}
