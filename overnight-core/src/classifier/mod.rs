//! Scenario classifier: maps a snapshot of five macro quotes to a trading regime.
//!
//! The classifier is a stateless service: it holds only the role → symbol
//! mapping and never retains anything between calls. `classify` is total: a
//! missing or malformed required quote yields the `InsufficientData`
//! sentinel, never a guess.

pub mod scenario;
pub mod signals;

pub use scenario::{Condition, Confidence, Scenario};
pub use signals::{ClassifierInputs, MarketSignals};

use serde::{Deserialize, Serialize};

use crate::data::universe::{Universe, UniverseError};
use crate::domain::{Role, Snapshot, Symbol};

/// Output of one classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: Scenario,
    pub name: String,
    pub policy_text: String,
    pub confidence: Confidence,
    /// Signals that were true for the matched rule (or the bullish readings
    /// for the fallback). Never truncated: a rule's confidence cap applies to
    /// `confidence` only, so Tech Divergence can list four signals at 3/4.
    pub matched_signals: Vec<String>,
    /// Required symbols that had no valid quote. Only set on the sentinel.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_symbols: Vec<Symbol>,
}

impl ScenarioResult {
    fn new(scenario: Scenario, confidence: Confidence, matched_signals: Vec<String>) -> Self {
        Self {
            scenario_id: scenario,
            name: scenario.name().to_string(),
            policy_text: scenario.policy_text().to_string(),
            confidence,
            matched_signals,
            missing_symbols: Vec::new(),
        }
    }

    /// The "insufficient data" sentinel.
    pub fn insufficient(missing_symbols: Vec<Symbol>) -> Self {
        Self {
            missing_symbols,
            ..Self::new(Scenario::InsufficientData, Confidence::zero(), Vec::new())
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.scenario_id == Scenario::InsufficientData
    }
}

/// Symbols for the five classifier roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioClassifier {
    asia_tech: Symbol,
    asia_broad: Symbol,
    europe: Symbol,
    rates: Symbol,
    currency: Symbol,
}

impl ScenarioClassifier {
    pub fn new(universe: &Universe) -> Result<Self, UniverseError> {
        let symbol = |role: Role| {
            universe
                .for_role(role)
                .map(|i| i.symbol.clone())
                .ok_or(UniverseError::MissingRole(role))
        };
        Ok(Self {
            asia_tech: symbol(Role::AsiaTech)?,
            asia_broad: symbol(Role::AsiaBroad)?,
            europe: symbol(Role::EuropeBroad)?,
            rates: symbol(Role::Rates)?,
            currency: symbol(Role::Currency)?,
        })
    }

    /// Required symbols in role order.
    pub fn required_symbols(&self) -> [&str; 5] {
        [
            &self.asia_tech,
            &self.asia_broad,
            &self.europe,
            &self.rates,
            &self.currency,
        ]
    }

    /// Classify a snapshot. Deterministic for identical input.
    pub fn classify(&self, snapshot: &Snapshot) -> ScenarioResult {
        let inputs = match (
            snapshot.get(&self.asia_tech),
            snapshot.get(&self.asia_broad),
            snapshot.get(&self.europe),
            snapshot.get(&self.rates),
            snapshot.get(&self.currency),
        ) {
            (Some(asia_tech), Some(asia_broad), Some(europe), Some(rates), Some(currency)) => {
                ClassifierInputs {
                    asia_tech,
                    asia_broad,
                    europe,
                    rates,
                    currency,
                }
            }
            _ => {
                let missing = snapshot.missing(self.required_symbols());
                return ScenarioResult::insufficient(missing);
            }
        };

        classify_signals(&MarketSignals::derive(&inputs))
    }
}

/// First-match-wins evaluation over already derived signals.
pub fn classify_signals(signals: &MarketSignals) -> ScenarioResult {
    for scenario in Scenario::PRIORITY {
        if !scenario.matches(signals) {
            continue;
        }
        let held: Vec<String> = scenario
            .conditions(signals)
            .into_iter()
            .filter(|c| c.holds)
            .map(|c| c.signal.to_string())
            .collect();
        let satisfied = (held.len() as u8).min(scenario.confidence_cap());
        return ScenarioResult::new(scenario, Confidence::new(satisfied), held);
    }

    // Fallback confidence is the raw bullish tally: diagnostic, not a match score.
    let bullish: Vec<String> = signals
        .bullish()
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| name.to_string())
        .collect();
    ScenarioResult::new(
        Scenario::MixedChop,
        Confidence::new(signals.bullish_count()),
        bullish,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quote;
    use chrono::DateTime;

    fn snapshot(changes: [f64; 5]) -> Snapshot {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let symbols = ["^N225", "^HSI", "^STOXX50E", "^TNX", "DX-Y.NYB"];
        symbols
            .iter()
            .zip(changes)
            .map(|(s, pct)| Quote::new(*s, 100.0, pct, pct, ts))
            .collect()
    }

    fn classifier() -> ScenarioClassifier {
        ScenarioClassifier::new(&Universe::default_overnight()).unwrap()
    }

    #[test]
    fn green_light_case() {
        let r = classifier().classify(&snapshot([1.2, 0.8, 0.9, -0.3, -0.4]));
        assert_eq!(r.scenario_id, Scenario::GreenLight);
        assert_eq!(r.confidence.to_string(), "4/4");
        assert_eq!(r.name, "Green Light");
    }

    #[test]
    fn tech_divergence_confidence_is_capped() {
        // asia strong, rates down, europe up, currency down but asia2 negative
        // so Green Light does not match; all four conditions of the rule hold.
        let r = classifier().classify(&snapshot([1.5, -0.2, 0.4, -0.3, -0.2]));
        assert_eq!(r.scenario_id, Scenario::TechDivergence);
        assert_eq!(r.confidence.to_string(), "3/4");
        assert_eq!(r.matched_signals.len(), 4);
    }

    #[test]
    fn tech_divergence_with_only_required_conditions() {
        let r = classifier().classify(&snapshot([1.5, -0.2, -0.4, -0.3, 0.2]));
        // Flight to Safety would match too, but Tech Divergence is checked first.
        assert_eq!(r.scenario_id, Scenario::TechDivergence);
        assert_eq!(r.confidence.to_string(), "2/4");
    }

    #[test]
    fn yield_choke_reports_three_of_four() {
        // rates spiking, dollar up, europe flat, asia up on both (no Dead Cat)
        let r = classifier().classify(&snapshot([0.3, 0.2, 0.1, 1.5, 0.3]));
        assert_eq!(r.scenario_id, Scenario::YieldChoke);
        assert_eq!(r.confidence.to_string(), "3/4");
    }

    #[test]
    fn the_ceiling_case() {
        let r = classifier().classify(&snapshot([0.6, 0.4, 0.8, 0.5, -0.1]));
        assert_eq!(r.scenario_id, Scenario::TheCeiling);
        assert_eq!(r.confidence.to_string(), "3/4");
    }

    #[test]
    fn mixed_chop_reports_bullish_count() {
        // asia up, europe down, rates up, currency down → no rule
        let r = classifier().classify(&snapshot([0.5, 0.5, -0.5, 0.2, -0.2]));
        assert_eq!(r.scenario_id, Scenario::MixedChop);
        assert_eq!(r.confidence.to_string(), "2/4");
        assert_eq!(r.matched_signals, vec!["asia_up", "currency_down"]);
    }

    #[test]
    fn missing_quote_is_sentinel_not_chop() {
        let mut snap = snapshot([1.2, 0.8, 0.9, -0.3, -0.4]);
        snap.remove("^HSI");
        let r = classifier().classify(&snap);
        assert!(r.is_insufficient());
        assert_ne!(r.scenario_id, Scenario::MixedChop);
        assert_eq!(r.confidence, Confidence::zero());
        assert_eq!(r.missing_symbols, vec!["^HSI".to_string()]);
        assert!(r.matched_signals.is_empty());
    }

    #[test]
    fn nan_quote_is_treated_as_missing() {
        let mut snap = snapshot([1.2, 0.8, 0.9, -0.3, -0.4]);
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        snap.insert(Quote::new("^TNX", f64::NAN, -0.01, -0.3, ts));
        let r = classifier().classify(&snap);
        assert!(r.is_insufficient());
        assert_eq!(r.missing_symbols, vec!["^TNX".to_string()]);
    }

    #[test]
    fn result_json_shape() {
        let r = classifier().classify(&snapshot([1.2, 0.8, 0.9, -0.3, -0.4]));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["scenario_id"], "green_light");
        assert_eq!(json["confidence"], "4/4");
        assert!(json.get("missing_symbols").is_none());
    }
}
