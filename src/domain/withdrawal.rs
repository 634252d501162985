use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Pending,
    Settled,
    Failed,
}

/// State of one early withdrawal, keyed by agreement id.
///
/// Written by the request phase together with the card top-up and moved
/// to `Settled` by the settlement phase, or to `Failed` by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub agreement_id: Uuid,
    pub card_id: Uuid,
    pub card_number: String,
    pub account_number: String,
    /// Amount moved from the agreement onto the card.
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub compensated: bool,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub failure: Option<String>,
}

impl Withdrawal {
    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }

    pub fn settle(&mut self, at: DateTime<Utc>) {
        self.status = WithdrawalStatus::Settled;
        self.resolved_at = Some(at);
    }

    pub fn fail(&mut self, at: DateTime<Utc>, reason: impl Into<String>, compensated: bool) {
        self.status = WithdrawalStatus::Failed;
        self.resolved_at = Some(at);
        self.failure = Some(reason.into());
        self.compensated = compensated;
    }
}

impl Record for Withdrawal {
    const COLLECTION: &'static str = "withdrawals";

    fn id(&self) -> String {
        self.agreement_id.to_string()
    }
}
