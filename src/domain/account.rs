use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Card, CurrencyCode};
use crate::ledger::Record;

/// A client account.
///
/// `current_balance` is derived: the ledger recomputes it from the
/// account's cards on every account write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub account_number: String,
    pub client_id: Uuid,
    pub current_balance: Decimal,
    pub currency_code: CurrencyCode,
    pub is_active: bool,
    pub open_date: NaiveDate,
    pub close_date: Option<NaiveDate>,
    pub blocked_sum: Decimal,
}

impl Account {
    /// A new active account with no cards.
    pub fn open(
        account_number: impl Into<String>,
        client_id: Uuid,
        currency_code: CurrencyCode,
        open_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_number: account_number.into(),
            client_id,
            current_balance: Decimal::ZERO,
            currency_code,
            is_active: true,
            open_date,
            close_date: None,
            blocked_sum: Decimal::ZERO,
        }
    }

    /// Set the balance to the sum of the given cards' balances.
    pub fn recompute_balance<'a>(&mut self, cards: impl IntoIterator<Item = &'a Card>) {
        self.current_balance = cards
            .into_iter()
            .filter(|card| card.account_id == self.id)
            .map(|card| card.balance)
            .sum();
    }
}

impl Record for Account {
    const COLLECTION: &'static str = "accounts";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("account_number", self.account_number.clone())]
    }
}
