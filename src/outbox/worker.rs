use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{OutboxMessage, OutboxStoreExt};
use crate::bus::Sender;
use crate::clock::Clock;
use crate::config::OutboxConfig;
use crate::ledger::{Ledger, LedgerStore, StoreError};

/// Result of a batch drain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainResult {
    pub claimed: usize,
    pub completed: usize,
    pub released: usize,
    pub failed: usize,
    /// Claimed but handed back unsent because an earlier message on the
    /// same channel failed.
    pub deferred: usize,
}

impl DrainResult {
    pub fn did_work(&self) -> bool {
        self.claimed > 0
    }
}

/// Result of relaying one claimed message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOneResult {
    pub completed: bool,
    pub released: bool,
    pub failed: bool,
}

/// Relays outbox messages from the ledger to their channels.
pub struct OutboxWorker<S, T> {
    ledger: Arc<Ledger<S>>,
    sender: T,
    clock: Arc<dyn Clock>,
    worker_id: String,
    batch_size: usize,
    lease: Duration,
    max_attempts: u32,
    retention: Duration,
    purge_interval: Duration,
}

impl<S, T> OutboxWorker<S, T> {
    pub fn new(ledger: Arc<Ledger<S>>, sender: T, clock: Arc<dyn Clock>) -> Self {
        let defaults = OutboxConfig::default();
        Self {
            ledger,
            sender,
            clock,
            worker_id: format!("outbox-relay-{}", std::process::id()),
            batch_size: defaults.batch_size,
            lease: defaults.lease(),
            max_attempts: defaults.max_attempts,
            retention: defaults.retention(),
            purge_interval: defaults.purge_interval(),
        }
    }

    /// Apply batch size, lease, attempt and retention limits from
    /// configuration.
    pub fn configured(self, config: &OutboxConfig) -> Self {
        self.with_batch_size(config.batch_size)
            .with_lease(config.lease())
            .with_max_attempts(config.max_attempts)
            .with_retention(config.retention())
            .with_purge_interval(config.purge_interval())
    }

    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// How long published messages are kept.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    pub fn purge_interval(&self) -> Duration {
        self.purge_interval
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn sender(&self) -> &T {
        &self.sender
    }
}

impl<S: LedgerStore, T: Sender> OutboxWorker<S, T> {
    /// Send one claimed message and record the outcome.
    pub fn process_message(&self, message: &OutboxMessage) -> Result<ProcessOneResult, StoreError> {
        let store = self.ledger.store();

        match self.sender.send(&message.channel, message.to_event()) {
            Ok(()) => {
                store.complete_outbox(&message.id, self.clock.now())?;
                debug!(
                    message_id = %message.id,
                    channel = %message.channel,
                    event_type = %message.event_type,
                    "outbox message relayed"
                );
                Ok(ProcessOneResult {
                    completed: true,
                    ..Default::default()
                })
            }
            Err(err) if message.attempts >= self.max_attempts => {
                let reason = err.to_string();
                store.fail_outbox(&message.id, &reason)?;
                error!(
                    message_id = %message.id,
                    channel = %message.channel,
                    attempts = message.attempts,
                    error = %reason,
                    "outbox message dead-lettered"
                );
                Ok(ProcessOneResult {
                    failed: true,
                    ..Default::default()
                })
            }
            Err(err) => {
                let reason = err.to_string();
                store.release_outbox(&message.id, &reason)?;
                warn!(
                    message_id = %message.id,
                    channel = %message.channel,
                    attempts = message.attempts,
                    error = %reason,
                    "outbox send failed, will retry"
                );
                Ok(ProcessOneResult {
                    released: true,
                    ..Default::default()
                })
            }
        }
    }

    /// Claim one batch and relay it.
    ///
    /// Once a message is released or dead-lettered, the rest of the batch on
    /// its channel is handed back unsent so the channel keeps its order.
    pub fn drain_once(&self) -> Result<DrainResult, StoreError> {
        let store = self.ledger.store();
        let claimed = store.claim_outbox(
            &self.worker_id,
            self.batch_size,
            self.lease,
            self.clock.now(),
        )?;

        let mut result = DrainResult {
            claimed: claimed.len(),
            ..Default::default()
        };
        let mut stalled: HashSet<&str> = HashSet::new();
        for message in &claimed {
            if stalled.contains(message.channel.as_str()) {
                store.unclaim_outbox(&message.id)?;
                result.deferred += 1;
                continue;
            }
            let processed = self.process_message(message)?;
            result.completed += usize::from(processed.completed);
            result.released += usize::from(processed.released);
            result.failed += usize::from(processed.failed);
            if !processed.completed {
                stalled.insert(message.channel.as_str());
            }
        }
        Ok(result)
    }

    /// Delete published messages older than the retention period.
    pub fn purge_published(&self) -> Result<usize, StoreError> {
        let retention =
            chrono::Duration::from_std(self.retention).unwrap_or_else(|_| chrono::Duration::days(1));
        let purged = self
            .ledger
            .store()
            .purge_published(self.clock.now() - retention)?;
        if purged > 0 {
            info!(purged, worker_id = %self.worker_id, "published outbox messages purged");
        }
        Ok(purged)
    }

    /// Relay full batches until a batch comes back short or sends nothing.
    /// Released messages wait for the next call.
    pub fn drain(&self) -> Result<DrainResult, StoreError> {
        let mut total = DrainResult::default();
        loop {
            let batch = self.drain_once()?;
            total.claimed += batch.claimed;
            total.completed += batch.completed;
            total.released += batch.released;
            total.failed += batch.failed;
            total.deferred += batch.deferred;
            if batch.completed == 0 || batch.claimed < self.batch_size {
                return Ok(total);
            }
        }
    }
}
