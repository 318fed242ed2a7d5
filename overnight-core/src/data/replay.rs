//! CSV replay tapes.
//!
//! A tape is a CSV of quote rows grouped into snapshots by their `tick`
//! column:
//!
//! ```text
//! tick,symbol,price,change,change_percent,observed_at
//! 0,^TNX,4.250,0.010,0.24,2024-03-05T13:30:00Z
//! 0,DX-Y.NYB,103.20,-0.10,-0.10,
//! 1,^TNX,4.300,0.060,1.41,
//! ```
//!
//! An empty `price` keeps the row out of its snapshot, the same as a symbol
//! the provider omitted. `observed_at` is optional; rows without it are
//! stamped `tick` seconds after the Unix epoch so ordering survives.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::provider::DataSource;
use super::scripted::{ScriptStep, ScriptedProvider};
use crate::domain::{Quote, Snapshot, Symbol};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("replay I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("replay CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("replay tape has no rows")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct ReplayRow {
    tick: u64,
    symbol: Symbol,
    price: Option<f64>,
    #[serde(default)]
    change: Option<f64>,
    #[serde(default)]
    change_percent: Option<f64>,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
}

impl ReplayRow {
    fn into_quote(self) -> Option<Quote> {
        let price = self.price?;
        let observed_at = self.observed_at.unwrap_or_else(|| {
            DateTime::from_timestamp(i64::try_from(self.tick).unwrap_or(i64::MAX), 0)
                .unwrap_or(DateTime::UNIX_EPOCH)
        });
        Some(Quote::new(
            self.symbol,
            price,
            self.change.unwrap_or(f64::NAN),
            self.change_percent.unwrap_or(f64::NAN),
            observed_at,
        ))
    }
}

/// Snapshots in tick order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayTape {
    snapshots: Vec<Snapshot>,
}

impl ReplayTape {
    pub fn from_path(path: &Path) -> Result<Self, ReplayError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReplayError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut by_tick: BTreeMap<u64, Snapshot> = BTreeMap::new();
        for row in rdr.deserialize::<ReplayRow>() {
            let row = row?;
            let snapshot = by_tick.entry(row.tick).or_default();
            if let Some(quote) = row.into_quote() {
                snapshot.insert(quote);
            }
        }

        if by_tick.is_empty() {
            return Err(ReplayError::Empty);
        }
        tracing::debug!(ticks = by_tick.len(), "loaded replay tape");
        Ok(Self {
            snapshots: by_tick.into_values().collect(),
        })
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// A provider that serves one tick per fetch and then keeps serving the
    /// last one. Ticks with no usable rows fetch as failures.
    pub fn into_provider(self) -> ScriptedProvider {
        let steps = self.snapshots.into_iter().map(ScriptStep::Snapshot);
        ScriptedProvider::new(steps).with_source(DataSource::Replay)
    }
}
