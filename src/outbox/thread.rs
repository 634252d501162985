//! Background outbox relay.

use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info};

use super::OutboxWorker;
use crate::bus::Sender as BusSender;
use crate::ledger::LedgerStore;

/// Statistics from the relay thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub messages_published: usize,
    pub messages_retried: usize,
    pub messages_dead_lettered: usize,
    pub messages_purged: usize,
    pub polls: usize,
}

/// A thread that keeps draining the outbox until stopped. Every purge
/// interval it also deletes published messages past their retention.
///
/// ```ignore
/// let relay = OutboxWorkerThread::spawn(worker, Duration::from_millis(20));
/// // ... run sagas ...
/// let stats = relay.stop();
/// println!("published {}", stats.messages_published);
/// ```
pub struct OutboxWorkerThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl OutboxWorkerThread {
    pub fn spawn<S, T>(worker: OutboxWorker<S, T>, poll_interval: Duration) -> Self
    where
        S: LedgerStore + 'static,
        T: BusSender + 'static,
    {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::Builder::new()
            .name("outbox-relay".into())
            .spawn(move || {
                let mut stats = WorkerStats::default();
                let mut last_purge = Instant::now();
                info!(worker_id = worker.worker_id(), "outbox relay started");

                loop {
                    match stop_rx.try_recv() {
                        Ok(()) | Err(TryRecvError::Disconnected) => break,
                        Err(TryRecvError::Empty) => {}
                    }

                    stats.polls += 1;

                    if last_purge.elapsed() >= worker.purge_interval() {
                        last_purge = Instant::now();
                        match worker.purge_published() {
                            Ok(purged) => stats.messages_purged += purged,
                            Err(err) => error!(error = %err, "outbox purge failed"),
                        }
                    }

                    match worker.drain_once() {
                        Ok(result) => {
                            stats.messages_published += result.completed;
                            stats.messages_retried += result.released;
                            stats.messages_dead_lettered += result.failed;
                            if result.completed > 0 {
                                continue;
                            }
                        }
                        Err(err) => error!(error = %err, "outbox drain failed"),
                    }

                    thread::sleep(poll_interval);
                }

                stats
            });

        match handle {
            Ok(handle) => Self {
                stop_tx,
                handle: Some(handle),
            },
            Err(err) => {
                error!(error = %err, "failed to spawn outbox relay thread");
                Self {
                    stop_tx,
                    handle: None,
                }
            }
        }
    }

    /// Signal the relay to stop and wait for it. Returns its statistics.
    pub fn stop(mut self) -> WorkerStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => WorkerStats::default(),
        }
    }

    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for OutboxWorkerThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
