use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Channel, ChannelEvent};
use crate::domain::Agreement;

/// Validated client request for a new deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDepositRequested {
    pub product_id: u32,
    pub initial_amount: Decimal,
    pub card_number: String,
    pub auto_renewal: bool,
    pub interest_rate: Decimal,
    pub duration_months: u32,
}

impl ChannelEvent for NewDepositRequested {
    const CHANNEL: Channel = Channel::NewDeposit;
    const EVENT_TYPE: &'static str = "NewDepositRequested";
}

/// The agreement as materialized by the core-banking system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepositMaterialized(pub Agreement);

impl ChannelEvent for DepositMaterialized {
    const CHANNEL: Channel = Channel::DepositCreated;
    const EVENT_TYPE: &'static str = "DepositMaterialized";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRenewalToggled {
    pub agreement_id: Uuid,
    pub auto_renewal: bool,
}

impl ChannelEvent for AutoRenewalToggled {
    const CHANNEL: Channel = Channel::AutoRenewal;
    const EVENT_TYPE: &'static str = "AutoRenewalToggled";
}
