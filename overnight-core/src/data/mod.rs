//! Quote acquisition: provider trait, Yahoo Finance client, circuit breaker,
//! scripted and replay feeds, and the instrument universe.

pub mod circuit_breaker;
pub mod provider;
pub mod replay;
pub mod scripted;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use provider::{DataError, DataSource, FetchResult, QuoteProvider};
pub use replay::{ReplayError, ReplayTape};
pub use scripted::{ScriptStep, ScriptedProvider};
pub use universe::{Universe, UniverseError};
pub use yahoo::{YahooOptions, YahooProvider};
