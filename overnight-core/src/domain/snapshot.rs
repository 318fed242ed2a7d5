//! A batch of near-simultaneous quotes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Quote, Symbol};

/// Quotes keyed by symbol, captured at approximately one instant.
///
/// Partial snapshots are legal. Lookups only ever return valid quotes: a
/// malformed quote is stored (so diagnostics can see it) but reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    quotes: BTreeMap<Symbol, Quote>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quote, replacing any earlier reading for the same symbol.
    pub fn insert(&mut self, quote: Quote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    /// Valid quote for `symbol`, if one is present.
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol).filter(|q| q.is_valid())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    /// Remove a symbol, returning the stored quote (valid or not).
    pub fn remove(&mut self, symbol: &str) -> Option<Quote> {
        self.quotes.remove(symbol)
    }

    /// Iterate over valid quotes in symbol order.
    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.values().filter(|q| q.is_valid())
    }

    /// Number of valid quotes.
    pub fn len(&self) -> usize {
        self.quotes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Symbols from `wanted` that have no valid quote here.
    pub fn missing<'a, I>(&self, wanted: I) -> Vec<Symbol>
    where
        I: IntoIterator<Item = &'a str>,
    {
        wanted
            .into_iter()
            .filter(|s| !self.contains(s))
            .map(str::to_string)
            .collect()
    }

    /// Latest observation time across valid quotes.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.quotes().map(|q| q.observed_at).max()
    }
}

impl FromIterator<Quote> for Snapshot {
    fn from_iter<T: IntoIterator<Item = Quote>>(iter: T) -> Self {
        let mut snapshot = Snapshot::new();
        for quote in iter {
            snapshot.insert(quote);
        }
        snapshot
    }
}
