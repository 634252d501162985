//! Deposit-account backend.
//!
//! Agreements, cards and accounts live in a versioned [`ledger`]. Three
//! sagas (deposit creation, card issuance and early withdrawal) talk to
//! the core-banking system over named [`bus`] channels; every event they
//! emit is written to the transactional [`outbox`] in the same commit as
//! the state change that caused it.
//!
//! ```ignore
//! use std::sync::Arc;
//! use deposit_service::{DepositConfig, DepositSystem, SystemClock};
//!
//! let system = DepositSystem::simulated(DepositConfig::from_env()?, Arc::new(SystemClock), None);
//! system.deposits().request_deposit(client_id, request)?;
//! system.run_until_idle()?;
//! ```

pub mod bus;
pub mod clock;
pub mod config;
pub mod consumer;
pub mod domain;
pub mod error;
pub mod events;
pub mod gateway;
#[cfg(feature = "http")]
pub mod http;
pub mod ledger;
pub mod lock;
pub mod outbox;
pub mod saga;
pub mod service;
pub mod system;
pub mod telemetry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, DepositConfig, OutboxConfig};
pub use error::DepositError;
pub use gateway::{AbsSimulator, Gateway, GatewayBridge};
pub use ledger::{InMemoryLedgerStore, Ledger, LedgerStore};
pub use system::{DepositSystem, IdleStats, RunningSystem, SystemStats};
