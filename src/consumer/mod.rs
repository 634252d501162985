//! Inbound side of the bus.
//!
//! An [`EventRouter`] maps event types to typed handlers and knows which
//! channels those handlers live on. It can be pumped synchronously
//! ([`EventRouter::pump`]) or driven by a background thread ([`listen`]).
//!
//! ```ignore
//! let router = Arc::new(
//!     EventRouter::new(config.channels.clone())
//!         .on(move |event: DepositMaterialized| deposits.on_deposit_materialized(event))
//!         .on(move |event: WithdrawalSettled| withdrawals.on_settlement(event)),
//! );
//!
//! let handle = consumer::listen(router, queue.clone(), "deposit-replies", Duration::from_millis(20));
//! // ...
//! let stats = handle.stop();
//! ```

mod router;
mod transport;

pub use router::{EventRouter, PumpStats};
pub use transport::{listen, TransportHandle, TransportStats};
