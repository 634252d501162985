//! Typed payloads for every channel between the deposit service and the
//! core-banking system.
//!
//! Field names on the wire are camelCase. Each payload type is bound to
//! one [`Channel`] role; [`ChannelNames`] maps roles to concrete channel
//! names.

mod card;
mod channel;
mod deposit;
mod withdrawal;

use serde::{de::DeserializeOwned, Serialize};

pub use card::{
    CardMaterialized, CardStatusChanged, CardStatusCommand, NewCardRequested, PinCodeChangeRequested,
};
pub use channel::{Channel, ChannelNames};
pub use deposit::{AutoRenewalToggled, DepositMaterialized, NewDepositRequested};
pub use withdrawal::{WithdrawalRequested, WithdrawalSettled};

/// A payload that travels on a fixed channel role.
pub trait ChannelEvent: Serialize + DeserializeOwned + Send + 'static {
    const CHANNEL: Channel;
    const EVENT_TYPE: &'static str;
}
