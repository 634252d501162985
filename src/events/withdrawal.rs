use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Channel, ChannelEvent};
use crate::domain::{CurrencyCode, OperationType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequested {
    pub agreement_id: Uuid,
    pub account_number: String,
}

impl ChannelEvent for WithdrawalRequested {
    const CHANNEL: Channel = Channel::WithdrawalRequest;
    const EVENT_TYPE: &'static str = "WithdrawalRequested";
}

/// Final balance and interest adjustment of an early withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalSettled {
    pub agreement_id: Uuid,
    pub account_number: String,
    pub is_active: bool,
    pub current_balance: Decimal,
    pub completed_at: DateTime<Utc>,
    pub sum: Decimal,
    pub currency_code: CurrencyCode,
    pub operation_type: OperationType,
}

impl ChannelEvent for WithdrawalSettled {
    const CHANNEL: Channel = Channel::WithdrawalSettled;
    const EVENT_TYPE: &'static str = "WithdrawalSettled";
}
