use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::Record;

/// A deposit contract between an account and a product.
///
/// Never deleted; an early withdrawal deactivates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub id: Uuid,
    pub number: String,
    pub interest_rate: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub initial_amount: Decimal,
    pub current_balance: Decimal,
    pub is_active: bool,
    pub auto_renewal: bool,
    pub account_id: Uuid,
    pub product_id: u32,
}

impl Record for Agreement {
    const COLLECTION: &'static str = "agreements";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("number", self.number.clone())]
    }
}
