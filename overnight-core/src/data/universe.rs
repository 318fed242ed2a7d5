//! Universe configuration: which symbols play which role.
//!
//! The universe names one instrument per classifier role plus the list of
//! symbols tracked by the inversion tripwires. It is loaded from the
//! `[universe]` table of the config file, or built from defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Instrument, Role, Symbol};

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("no instrument assigned to role '{0:?}'")]
    MissingRole(Role),

    #[error("role '{0:?}' is assigned to more than one instrument")]
    DuplicateRole(Role),

    #[error("tracked symbol '{0}' is not listed under instruments")]
    UnknownTracked(Symbol),

    #[error("at least one tripwire symbol must be tracked")]
    NothingTracked,
}

/// The full instrument set for the flow matrix and tripwires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Universe {
    pub instruments: Vec<Instrument>,
    /// Symbols monitored by the tripwire session, in display order.
    pub tracked: Vec<Symbol>,
}

impl Universe {
    /// Check that every classifier role appears exactly once and that every
    /// tracked symbol is a known instrument.
    pub fn validate(&self) -> Result<(), UniverseError> {
        for role in Role::CLASSIFIER {
            match self.instruments.iter().filter(|i| i.role == role).count() {
                0 => return Err(UniverseError::MissingRole(role)),
                1 => {}
                _ => return Err(UniverseError::DuplicateRole(role)),
            }
        }
        if self.tracked.is_empty() {
            return Err(UniverseError::NothingTracked);
        }
        for symbol in &self.tracked {
            if self.instrument(symbol).is_none() {
                return Err(UniverseError::UnknownTracked(symbol.clone()));
            }
        }
        Ok(())
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    /// The instrument playing `role`, if any.
    pub fn for_role(&self, role: Role) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.role == role)
    }

    /// Instruments monitored by the tripwires, in `tracked` order.
    pub fn tracked_instruments(&self) -> Vec<Instrument> {
        self.tracked
            .iter()
            .filter_map(|s| self.instrument(s).cloned())
            .collect()
    }

    /// Every symbol the provider has to be asked for.
    pub fn all_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.instruments.iter().map(|i| i.symbol.clone()).collect();
        for s in &self.tracked {
            if !symbols.contains(s) {
                symbols.push(s.clone());
            }
        }
        symbols
    }

    /// Default overnight universe: Nikkei, Hang Seng, Euro Stoxx 50, US 10Y
    /// yield and the dollar index; the yield and the dollar are tracked.
    pub fn default_overnight() -> Self {
        Self {
            instruments: vec![
                Instrument::new("^N225", "Nikkei 225", Role::AsiaTech),
                Instrument::new("^HSI", "Hang Seng", Role::AsiaBroad),
                Instrument::new("^STOXX50E", "Euro Stoxx 50", Role::EuropeBroad),
                Instrument::new("^TNX", "US 10Y Yield", Role::Rates),
                Instrument::new("DX-Y.NYB", "Dollar Index", Role::Currency),
            ],
            tracked: vec!["^TNX".into(), "DX-Y.NYB".into()],
        }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::default_overnight()
    }
}
