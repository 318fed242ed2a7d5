//! Boolean market signals derived from the five classifier quotes.

use serde::{Deserialize, Serialize};

use crate::domain::Quote;

/// Europe counts as flat inside this band (percent, inclusive).
pub const EUROPE_FLAT_BAND_PCT: f64 = 0.25;
/// Rate-proxy move above this (percent) is a spike.
pub const RATES_SPIKE_PCT: f64 = 1.0;
/// Tech-heavy Asia move above this (percent) is strong.
pub const ASIA_STRONG_PCT: f64 = 1.0;

/// The five quotes the classifier reads, one per role.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInputs<'a> {
    pub asia_tech: &'a Quote,
    pub asia_broad: &'a Quote,
    pub europe: &'a Quote,
    pub rates: &'a Quote,
    pub currency: &'a Quote,
}

/// Derived booleans. Up/down predicates use raw sign; the flat-noise
/// threshold of `Direction` does not apply here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketSignals {
    pub asia_up: bool,
    pub asia_down: bool,
    pub asia_strong: bool,
    pub europe_up: bool,
    pub europe_down: bool,
    pub europe_flat: bool,
    pub rates_up: bool,
    pub rates_down: bool,
    pub rates_spiking: bool,
    pub currency_up: bool,
    pub currency_down: bool,
}

impl MarketSignals {
    pub fn derive(inputs: &ClassifierInputs<'_>) -> Self {
        let asia1 = inputs.asia_tech.change_percent;
        let asia2 = inputs.asia_broad.change_percent;
        let europe = inputs.europe.change_percent;

        Self {
            // Asymmetric on purpose: calling Asia "up" needs both proxies to
            // confirm, calling it "down" needs only one. Kept as domain policy.
            asia_up: asia1 > 0.0 && asia2 > 0.0,
            asia_down: asia1 < 0.0 || asia2 < 0.0,
            asia_strong: asia1 > ASIA_STRONG_PCT,
            europe_up: europe > 0.0,
            europe_down: europe < 0.0,
            europe_flat: europe.abs() <= EUROPE_FLAT_BAND_PCT,
            // Rate direction follows the absolute change; the spike test uses percent.
            rates_up: inputs.rates.change > 0.0,
            rates_down: inputs.rates.change < 0.0,
            rates_spiking: inputs.rates.change_percent > RATES_SPIKE_PCT,
            currency_up: inputs.currency.change_percent > 0.0,
            currency_down: inputs.currency.change_percent < 0.0,
        }
    }

    /// The four risk-on readings, by name.
    pub fn bullish(&self) -> [(&'static str, bool); 4] {
        [
            ("asia_up", self.asia_up),
            ("europe_up", self.europe_up),
            ("rates_down", self.rates_down),
            ("currency_down", self.currency_down),
        ]
    }

    pub fn bullish_count(&self) -> u8 {
        self.bullish().iter().filter(|(_, on)| *on).count() as u8
    }
}
