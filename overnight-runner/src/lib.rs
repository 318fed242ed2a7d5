//! Overnight Runner: refresh orchestration around `overnight-core`.
//!
//! This crate builds on `overnight-core` to provide:
//! - TOML configuration with validated refresh cadence
//! - Background fetch worker and the fixed-cadence refresh loop
//! - Dashboard state (classifier, owned tripwire session, staleness)
//! - Serializable dashboard view and output sinks
//! - Offline replay of a recorded tape
//! - Logging initialisation

pub mod config;
pub mod dashboard;
pub mod logging;
pub mod refresh_loop;
pub mod replay;
pub mod sink;
pub mod view;
pub mod worker;

pub use config::{AppConfig, ConfigError, ProviderConfig, ProviderKind, RefreshConfig};
pub use dashboard::{CommandError, Dashboard, OperatorCommand, SessionOptions, TickSummary};
pub use logging::init_logging;
pub use refresh_loop::{LoopEvent, LoopHandle, LoopStats, RefreshLoop, TickDecision};
pub use replay::{replay_tape, ReplayRunError};
pub use sink::{DashboardSink, MemorySink, StdoutSink};
pub use view::{DashboardView, SessionView, TripwireRow};
