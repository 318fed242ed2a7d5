//! Scenario catalogue and the ordered rule table.
//!
//! Rules are checked in `Scenario::PRIORITY` order and the first whose
//! required conditions all hold wins. Predicates overlap by construction, so
//! the order is part of the behavior: Dead Cat sits first because the
//! defensive call overrides every other match.

use serde::{Deserialize, Serialize};

use super::signals::MarketSignals;

/// Every scenario the flow matrix can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    DeadCat,
    GreenLight,
    TechDivergence,
    FlightToSafety,
    YieldChoke,
    TheCeiling,
    /// Fallback when no rule matched.
    MixedChop,
    /// Sentinel: a required quote was missing. Not a scenario call.
    InsufficientData,
}

/// One boolean sub-condition of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub signal: &'static str,
    pub holds: bool,
    /// Required conditions decide the match; the rest only add confidence.
    pub required: bool,
}

impl Condition {
    fn required(signal: &'static str, holds: bool) -> Self {
        Self {
            signal,
            holds,
            required: true,
        }
    }

    fn supporting(signal: &'static str, holds: bool) -> Self {
        Self {
            signal,
            holds,
            required: false,
        }
    }
}

impl Scenario {
    /// Rule evaluation order. Must not be reordered.
    pub const PRIORITY: [Scenario; 6] = [
        Scenario::DeadCat,
        Scenario::GreenLight,
        Scenario::TechDivergence,
        Scenario::FlightToSafety,
        Scenario::YieldChoke,
        Scenario::TheCeiling,
    ];

    /// Every scenario in display order (rules, then fallback, then sentinel).
    pub fn all() -> [Scenario; 8] {
        [
            Scenario::DeadCat,
            Scenario::GreenLight,
            Scenario::TechDivergence,
            Scenario::FlightToSafety,
            Scenario::YieldChoke,
            Scenario::TheCeiling,
            Scenario::MixedChop,
            Scenario::InsufficientData,
        ]
    }

    pub fn id(self) -> &'static str {
        match self {
            Scenario::DeadCat => "dead_cat",
            Scenario::GreenLight => "green_light",
            Scenario::TechDivergence => "tech_divergence",
            Scenario::FlightToSafety => "flight_to_safety",
            Scenario::YieldChoke => "yield_choke",
            Scenario::TheCeiling => "the_ceiling",
            Scenario::MixedChop => "mixed_chop",
            Scenario::InsufficientData => "insufficient_data",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scenario::DeadCat => "Dead Cat",
            Scenario::GreenLight => "Green Light",
            Scenario::TechDivergence => "Tech Divergence",
            Scenario::FlightToSafety => "Flight to Safety",
            Scenario::YieldChoke => "Yield Choke",
            Scenario::TheCeiling => "The Ceiling",
            Scenario::MixedChop => "Mixed / Chop",
            Scenario::InsufficientData => "Insufficient Data",
        }
    }

    pub fn policy_text(self) -> &'static str {
        match self {
            Scenario::DeadCat => {
                "No trade. Capital preservation: overnight bounce is not confirmed by rates, \
                 dollar or Europe. Stand aside until the open proves otherwise."
            }
            Scenario::GreenLight => {
                "Long high-beta exposure. Wait for the 15-minute opening range to complete and \
                 enter only on a break above its high. Do not chase the initial move."
            }
            Scenario::TechDivergence => {
                "Narrow sector exposure: trade semiconductors/tech only and ignore broad-index \
                 noise while rates are easing."
            }
            Scenario::FlightToSafety => {
                "Short broad equity exposure via index puts. Do NOT use UVXY: its decay loses \
                 money even when the directional call is right."
            }
            Scenario::YieldChoke => {
                "Short tech exposure. Place the entry stop a 0.5% buffer above the pre-market \
                 high so thin-liquidity noise does not take you out."
            }
            Scenario::TheCeiling => {
                "Long but capped: take half off by 11:00 ET, move the stop to breakeven, and be \
                 flat by the close."
            }
            Scenario::MixedChop => "No trade. Signals disagree; chop eats both sides.",
            Scenario::InsufficientData => {
                "No call. One or more required quotes are missing; waiting for a complete snapshot."
            }
        }
    }

    /// Whether this scenario says to stay out of the market.
    pub fn is_no_trade(self) -> bool {
        matches!(
            self,
            Scenario::DeadCat | Scenario::MixedChop | Scenario::InsufficientData
        )
    }

    /// Highest confidence this rule may report.
    pub fn confidence_cap(self) -> u8 {
        match self {
            // Capped even when the supporting conditions also line up.
            Scenario::TechDivergence => 3,
            _ => Confidence::SCALE,
        }
    }

    /// Sub-conditions of the rule for this scenario. Empty for the fallback
    /// and the sentinel.
    pub fn conditions(self, s: &MarketSignals) -> Vec<Condition> {
        match self {
            Scenario::DeadCat => vec![
                Condition::required("asia_down", s.asia_down),
                Condition::required("rates_up", s.rates_up),
                Condition::required("currency_up", s.currency_up),
                Condition::required("europe_flat_or_down", s.europe_flat || s.europe_down),
            ],
            Scenario::GreenLight => vec![
                Condition::required("asia_up", s.asia_up),
                Condition::required("europe_up", s.europe_up),
                Condition::required("rates_down", s.rates_down),
                Condition::required("currency_down", s.currency_down),
            ],
            Scenario::TechDivergence => vec![
                Condition::required("asia_strong", s.asia_strong),
                Condition::required("rates_down", s.rates_down),
                Condition::supporting("currency_down", s.currency_down),
                Condition::supporting("europe_up", s.europe_up),
            ],
            Scenario::FlightToSafety => vec![
                Condition::required("asia_down", s.asia_down),
                Condition::required("europe_down", s.europe_down),
                Condition::required("rates_down", s.rates_down),
                Condition::required("currency_up", s.currency_up),
            ],
            Scenario::YieldChoke => vec![
                Condition::required("rates_spiking", s.rates_spiking),
                Condition::required("currency_up", s.currency_up),
                Condition::required("europe_flat", s.europe_flat),
            ],
            Scenario::TheCeiling => vec![
                Condition::required("asia_up", s.asia_up),
                Condition::required("europe_up", s.europe_up),
                Condition::required("rates_up", s.rates_up),
            ],
            Scenario::MixedChop | Scenario::InsufficientData => Vec::new(),
        }
    }

    /// True when every required condition holds.
    pub fn matches(self, s: &MarketSignals) -> bool {
        let conditions = self.conditions(s);
        !conditions.is_empty() && conditions.iter().filter(|c| c.required).all(|c| c.holds)
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Count of satisfied sub-conditions, reported as "k/4". Not a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Confidence(u8);

impl Confidence {
    pub const SCALE: u8 = 4;

    /// Clamp to the 0..=4 scale.
    pub fn new(satisfied: u8) -> Self {
        Self(satisfied.min(Self::SCALE))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn satisfied(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::SCALE)
    }
}

impl From<Confidence> for String {
    fn from(c: Confidence) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for Confidence {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (k, scale) = value
            .split_once('/')
            .ok_or_else(|| format!("confidence '{value}' is not of the form k/4"))?;
        if scale.trim() != Self::SCALE.to_string() {
            return Err(format!("confidence '{value}' must be out of {}", Self::SCALE));
        }
        let k: u8 = k
            .trim()
            .parse()
            .map_err(|e| format!("confidence '{value}': {e}"))?;
        if k > Self::SCALE {
            return Err(format!("confidence '{value}' exceeds {}", Self::SCALE));
        }
        Ok(Self(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_fixed() {
        assert_eq!(
            Scenario::PRIORITY,
            [
                Scenario::DeadCat,
                Scenario::GreenLight,
                Scenario::TechDivergence,
                Scenario::FlightToSafety,
                Scenario::YieldChoke,
                Scenario::TheCeiling,
            ]
        );
    }

    #[test]
    fn fallback_and_sentinel_never_match() {
        let all_on = MarketSignals {
            asia_up: true,
            asia_down: true,
            asia_strong: true,
            europe_up: true,
            europe_down: true,
            europe_flat: true,
            rates_up: true,
            rates_down: true,
            rates_spiking: true,
            currency_up: true,
            currency_down: true,
        };
        assert!(!Scenario::MixedChop.matches(&all_on));
        assert!(!Scenario::InsufficientData.matches(&all_on));
        for rule in Scenario::PRIORITY {
            assert!(rule.matches(&all_on), "{rule} should match all-on signals");
        }
    }

    #[test]
    fn dead_cat_accepts_flat_or_down_europe() {
        let mut s = MarketSignals {
            asia_down: true,
            rates_up: true,
            currency_up: true,
            europe_down: true,
            ..MarketSignals::default()
        };
        assert!(Scenario::DeadCat.matches(&s));
        s.europe_down = false;
        assert!(!Scenario::DeadCat.matches(&s));
        s.europe_flat = true;
        assert!(Scenario::DeadCat.matches(&s));
    }

    #[test]
    fn tech_divergence_ignores_supporting_conditions_for_match() {
        let s = MarketSignals {
            asia_strong: true,
            rates_down: true,
            ..MarketSignals::default()
        };
        assert!(Scenario::TechDivergence.matches(&s));
        assert_eq!(Scenario::TechDivergence.confidence_cap(), 3);
    }

    #[test]
    fn confidence_display_and_parse() {
        let c = Confidence::new(3);
        assert_eq!(c.to_string(), "3/4");
        assert_eq!(Confidence::try_from("3/4".to_string()).unwrap(), c);
        assert!(Confidence::try_from("5/4".to_string()).is_err());
        assert!(Confidence::try_from("2/5".to_string()).is_err());
        assert!(Confidence::try_from("two".to_string()).is_err());
        assert_eq!(Confidence::new(9).satisfied(), 4);
    }

    #[test]
    fn confidence_serializes_as_fraction_string() {
        let json = serde_json::to_string(&Confidence::new(4)).unwrap();
        assert_eq!(json, "\"4/4\"");
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<&str> = Scenario::all().iter().map(|s| s.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }
}
