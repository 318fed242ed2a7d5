use serde::{Deserialize, Serialize};

use super::Symbol;

/// What an instrument stands for on the flow matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Tech-heavy Asian index (first Asia proxy).
    AsiaTech,
    /// Broad Asian index (second Asia proxy).
    AsiaBroad,
    /// Broad European index.
    EuropeBroad,
    /// Benchmark long yield.
    Rates,
    /// Dollar-strength index.
    Currency,
}

impl Role {
    /// The five roles the scenario classifier needs, in evaluation order.
    pub const CLASSIFIER: [Role; 5] = [
        Role::AsiaTech,
        Role::AsiaBroad,
        Role::EuropeBroad,
        Role::Rates,
        Role::Currency,
    ];

    /// Domain meaning shown next to the quote.
    pub fn meaning(self) -> &'static str {
        match self {
            Role::AsiaTech => "asia tech sentiment",
            Role::AsiaBroad => "asia broad risk appetite",
            Role::EuropeBroad => "europe open handoff",
            Role::Rates => "cost of capital",
            Role::Currency => "dollar liquidity",
        }
    }
}

/// Static identity of a market instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    #[serde(rename = "label")]
    pub display_label: String,
    pub role: Role,
}

impl Instrument {
    pub fn new(symbol: impl Into<Symbol>, display_label: impl Into<String>, role: Role) -> Self {
        Self {
            symbol: symbol.into(),
            display_label: display_label.into(),
            role,
        }
    }
}
