//! Fixed-cadence refresh loop with an at-most-one-in-flight fetch guard.
//!
//! Every mutation of the dashboard happens on the thread that owns the
//! `RefreshLoop`. The only suspension point is the fetch, which runs on the
//! worker thread; its result comes back as a [`LoopEvent`] on the same
//! channel operator commands use, so a command and a tick update can never
//! interleave.
//!
//! A tick that fires while the previous fetch is unresolved is dropped,
//! never queued. A tick is also skipped, and counted as a failure, while the
//! provider reports itself unavailable. After [`RefreshLoop::dispose`] nothing mutates the
//! dashboard again, including a fetch that resolves late.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Utc;

use overnight_core::data::{DataError, FetchResult, QuoteProvider};
use overnight_core::domain::Symbol;

use crate::dashboard::{Dashboard, OperatorCommand};
use crate::sink::DashboardSink;
use crate::worker::{spawn_worker, WorkerCommand};

/// Everything the loop thread reacts to.
#[derive(Debug)]
pub enum LoopEvent {
    /// A fetch resolved on the worker.
    Fetched {
        seq: u64,
        result: Result<FetchResult, DataError>,
    },
    Operator(OperatorCommand),
    Shutdown,
}

/// What a timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Dispatched { seq: u64 },
    /// The previous fetch is still unresolved.
    Dropped,
    /// The provider reported itself blocked or cooling down; nothing was sent.
    ProviderUnavailable,
    /// The worker thread is gone; nothing can be fetched.
    WorkerGone,
    Disposed,
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub dispatched: u64,
    pub dropped_ticks: u64,
    /// Ticks skipped because the provider was unavailable.
    pub unavailable_ticks: u64,
    pub applied: u64,
    pub failed: u64,
    /// Results ignored because the loop was disposed or they were superseded.
    pub discarded: u64,
    pub commands: u64,
}

/// Cloneable handle for posting operator commands from other threads.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: Sender<LoopEvent>,
}

impl LoopHandle {
    /// Queue an operator command. Returns false once the loop has gone away.
    pub fn send(&self, command: OperatorCommand) -> bool {
        self.tx.send(LoopEvent::Operator(command)).is_ok()
    }

    /// Ask the loop to stop after the event it is handling.
    pub fn shutdown(&self) -> bool {
        self.tx.send(LoopEvent::Shutdown).is_ok()
    }
}

pub struct RefreshLoop {
    dashboard: Dashboard,
    provider: Arc<dyn QuoteProvider>,
    symbols: Vec<Symbol>,
    interval: Duration,
    events_tx: Sender<LoopEvent>,
    events_rx: Receiver<LoopEvent>,
    worker_tx: Sender<WorkerCommand>,
    worker: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    in_flight: Option<u64>,
    next_seq: u64,
    disposed: bool,
    stats: LoopStats,
}

impl RefreshLoop {
    /// Start the fetch worker. No fetch is dispatched until the first tick.
    pub fn spawn(
        dashboard: Dashboard,
        provider: Arc<dyn QuoteProvider>,
        symbols: Vec<Symbol>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (events_tx, events_rx) = mpsc::channel();
        let (worker_tx, worker_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker = spawn_worker(
            Arc::clone(&provider),
            worker_rx,
            events_tx.clone(),
            Arc::clone(&cancel),
        )?;

        Ok(Self {
            dashboard,
            provider,
            symbols,
            interval,
            events_tx,
            events_rx,
            worker_tx,
            worker: Some(worker),
            cancel,
            in_flight: None,
            next_seq: 0,
            disposed: false,
            stats: LoopStats::default(),
        })
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            tx: self.events_tx.clone(),
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Timer callback: dispatch a fetch unless one is already outstanding.
    pub fn tick(&mut self) -> TickDecision {
        if self.disposed {
            return TickDecision::Disposed;
        }
        if self.worker.as_ref().map_or(true, JoinHandle::is_finished) {
            // A dead worker never answers the fetch it was given.
            self.in_flight = None;
            tracing::error!("fetch worker is gone");
            return TickDecision::WorkerGone;
        }
        if let Some(seq) = self.in_flight {
            self.stats.dropped_ticks += 1;
            tracing::debug!(seq, "previous fetch unresolved, dropping tick");
            return TickDecision::Dropped;
        }
        if !self.provider.is_available() {
            self.stats.unavailable_ticks += 1;
            self.dashboard.record_failure(&DataError::CircuitBreakerTripped);
            tracing::warn!(provider = self.provider.name(), "provider unavailable, skipping tick");
            return TickDecision::ProviderUnavailable;
        }

        let seq = self.next_seq;
        let command = WorkerCommand::Fetch {
            seq,
            symbols: self.symbols.clone(),
        };
        if self.worker_tx.send(command).is_err() {
            tracing::error!("fetch worker is gone");
            return TickDecision::WorkerGone;
        }
        self.next_seq += 1;
        self.in_flight = Some(seq);
        self.stats.dispatched += 1;
        TickDecision::Dispatched { seq }
    }

    /// Apply one event. `Break` means the loop should stop.
    pub fn handle_event(
        &mut self,
        event: LoopEvent,
        sink: &mut dyn DashboardSink,
    ) -> ControlFlow<()> {
        if self.disposed {
            if let LoopEvent::Fetched { seq, .. } = event {
                self.stats.discarded += 1;
                tracing::debug!(seq, "fetch resolved after dispose, discarding");
            }
            return ControlFlow::Break(());
        }

        match event {
            LoopEvent::Fetched { seq, result } => {
                if self.in_flight != Some(seq) {
                    self.stats.discarded += 1;
                    tracing::debug!(seq, "result for a fetch no longer in flight, discarding");
                    return ControlFlow::Continue(());
                }
                self.in_flight = None;

                let now = Utc::now();
                match result {
                    Ok(fetch) => {
                        self.dashboard.apply_fetch(fetch, now);
                        self.stats.applied += 1;
                    }
                    Err(e) => {
                        self.dashboard.record_failure(&e);
                        self.stats.failed += 1;
                        sink.on_fetch_error(&e, self.dashboard.consecutive_failures());
                    }
                }
                sink.on_update(&self.dashboard.view(now));
                ControlFlow::Continue(())
            }
            LoopEvent::Operator(command) => {
                let result = self.dashboard.apply_command(command);
                self.stats.commands += 1;
                sink.on_command(command, &result);
                sink.on_update(&self.dashboard.view(Utc::now()));
                ControlFlow::Continue(())
            }
            LoopEvent::Shutdown => {
                self.dispose();
                ControlFlow::Break(())
            }
        }
    }

    /// Wait up to `timeout` for one event and apply it.
    ///
    /// Returns `None` on timeout, otherwise what `handle_event` returned.
    pub fn pump(
        &mut self,
        timeout: Duration,
        sink: &mut dyn DashboardSink,
    ) -> Option<ControlFlow<()>> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Some(self.handle_event(event, sink)),
            Err(RecvTimeoutError::Timeout) => None,
            // Unreachable while `events_tx` is held, but stop cleanly anyway.
            Err(RecvTimeoutError::Disconnected) => Some(ControlFlow::Break(())),
        }
    }

    /// Tick on a fixed cadence until shut down, starting with an immediate tick.
    pub fn run(&mut self, sink: &mut dyn DashboardSink) {
        let mut next_tick = Instant::now();
        while !self.disposed {
            if Instant::now() >= next_tick {
                if self.tick() == TickDecision::WorkerGone {
                    break;
                }
                next_tick += self.interval;
                // Fell behind by more than a whole interval: realign instead of bursting.
                if next_tick < Instant::now() {
                    next_tick = Instant::now() + self.interval;
                }
            }

            let wait = next_tick.saturating_duration_since(Instant::now());
            if let Some(ControlFlow::Break(())) = self.pump(wait, sink) {
                break;
            }
        }
        self.dispose();
    }

    /// Cancel any pending fetch and stop the worker. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.cancel.store(true, Ordering::Release);
        let _ = self.worker_tx.send(WorkerCommand::Shutdown);
        if self.in_flight.take().is_some() {
            tracing::debug!("pending fetch cancelled");
        }
        // Not joined: a blocking request cannot be interrupted, and the
        // cancel flag keeps its result from being sent.
        self.worker.take();
        tracing::info!("refresh loop disposed");
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.dispose();
    }
}
