//! Inversion tripwires: thesis invalidation against a locked baseline.

pub mod session;
pub mod thesis;

pub use session::{
    Operation, RefreshOutcome, SessionState, TripwireError, TripwireInstrument, TripwireSession,
};
pub use thesis::{is_inverted, Expectation, Thesis};
