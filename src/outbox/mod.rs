//! Transactional outbox.
//!
//! Saga steps never send on the bus directly. They stage an
//! [`OutboxMessage`] in the same ledger commit as their state changes; an
//! [`OutboxWorker`] later claims pending messages, sends them to their
//! channel and marks them published. A message that keeps failing is
//! released for retry until `max_attempts`, then parked as `Failed`
//! (the dead-letter set, see [`OutboxStoreExt::dead_letters`]).
//!
//! Each channel is relayed in commit order: nothing later on a channel is
//! sent while an earlier message on it is retrying or dead-lettered.
//! Published messages are purged once older than the retention period.
//!
//! ```ignore
//! ledger.transaction(|tx| {
//!     tx.put_agreement(agreement)?;
//!     tx.enqueue(&channels, &AutoRenewalToggled { agreement_id, auto_renewal: true })
//! })?;
//!
//! let worker = OutboxWorker::new(ledger.clone(), queue.clone(), clock);
//! worker.drain()?;
//! ```

mod message;
mod store;
mod thread;
mod worker;

pub use message::{OutboxMessage, OutboxStatus};
pub use store::OutboxStoreExt;
pub use thread::{OutboxWorkerThread, WorkerStats};
pub use worker::{DrainResult, OutboxWorker, ProcessOneResult};
