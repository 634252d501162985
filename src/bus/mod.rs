//! Message bus - named point-to-point channels between the deposit
//! service and the core-banking system.
//!
//! ```text
//!  saga step ──commit──► outbox ──relay──► Sender::send(channel, event)
//!                                                  │
//!                                                  ▼
//!                                  ┌───────────────────────────────┐
//!                                  │ named channel (FIFO)          │
//!                                  │ InMemoryQueue / broker topic  │
//!                                  └───────────────────────────────┘
//!                                                  │
//!                                                  ▼
//!                         Listener::listen(channel) ──► gateway / router
//! ```
//!
//! Each event on a channel is delivered to exactly one listener, in the
//! order it was sent. Nothing orders events across channels.

mod event;
mod in_memory_queue;
mod listener;
mod sender;

pub use event::{Event, PublishError};
pub use in_memory_queue::InMemoryQueue;
pub use listener::Listener;
pub use sender::Sender;
