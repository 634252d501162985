use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CurrencyCode;
use crate::ledger::Record;

/// Kind of a ledger movement, as classified by the core-banking system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationType {
    pub id: u32,
    #[serde(rename = "type")]
    pub name: String,
    pub is_debit: bool,
}

impl OperationType {
    pub fn replenishment() -> Self {
        Self {
            id: 1,
            name: "REPLENISHMENT".into(),
            is_debit: true,
        }
    }

    pub fn refill() -> Self {
        Self {
            id: 2,
            name: "REFILL".into(),
            is_debit: false,
        }
    }
}

/// Append-only audit entry for a balance-affecting event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: Uuid,
    pub account_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub sum: Decimal,
    pub currency_code: CurrencyCode,
    pub details: Option<String>,
    pub operation_type: OperationType,
}

impl Record for Operation {
    const COLLECTION: &'static str = "operations";

    fn id(&self) -> String {
        self.id.to_string()
    }
}
