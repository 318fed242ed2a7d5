//! Domain types for the overnight flow matrix

pub mod instrument;
pub mod quote;
pub mod snapshot;

pub use instrument::{Instrument, Role};
pub use quote::{Direction, Quote, FLAT_THRESHOLD_PCT};
pub use snapshot::Snapshot;

/// Symbol type alias
pub type Symbol = String;
