//! Background fetch worker: the network round trip runs here.
//!
//! The worker owns nothing but the provider. It never touches dashboard
//! state; results go back to the refresh loop over the event channel and are
//! applied there.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use overnight_core::data::{DataError, FetchResult, QuoteProvider};
use overnight_core::domain::Symbol;

use crate::refresh_loop::LoopEvent;

/// Commands sent from the refresh loop to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Fetch { seq: u64, symbols: Vec<Symbol> },
    Shutdown,
}

/// Spawn the fetch worker thread.
pub fn spawn_worker(
    provider: Arc<dyn QuoteProvider>,
    rx: Receiver<WorkerCommand>,
    tx: Sender<LoopEvent>,
    cancel: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("overnight-fetch".into())
        .spawn(move || worker_loop(provider, rx, tx, cancel))
}

fn worker_loop(
    provider: Arc<dyn QuoteProvider>,
    rx: Receiver<WorkerCommand>,
    tx: Sender<LoopEvent>,
    cancel: Arc<AtomicBool>,
) {
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::Fetch { seq, symbols }) => {
                if cancel.load(Ordering::Acquire) {
                    break;
                }
                tracing::debug!(seq, provider = provider.name(), "fetch started");
                let result = guarded_fetch(provider.as_ref(), &symbols);

                // Teardown may have happened while the request was out.
                if cancel.load(Ordering::Acquire) {
                    tracing::debug!(seq, "fetch resolved after cancel, dropping result");
                    break;
                }
                if tx.send(LoopEvent::Fetched { seq, result }).is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("fetch worker stopped");
}

/// Run one fetch, turning a provider panic into a failed fetch so the
/// worker survives it.
fn guarded_fetch(
    provider: &dyn QuoteProvider,
    symbols: &[Symbol],
) -> Result<FetchResult, DataError> {
    match panic::catch_unwind(AssertUnwindSafe(|| provider.fetch(symbols))) {
        Ok(result) => result,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(provider = provider.name(), %reason, "provider panicked during fetch");
            Err(DataError::Other(format!(
                "provider {} panicked: {reason}",
                provider.name()
            )))
        }
    }
}
