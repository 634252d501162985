use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Active,
    Blocked,
    Closed,
}

impl CardStatus {
    pub const ALL: [CardStatus; 3] = [CardStatus::Active, CardStatus::Blocked, CardStatus::Closed];
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardStatus::Active => "ACTIVE",
            CardStatus::Blocked => "BLOCKED",
            CardStatus::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DigitalWallet {
    ApplePay,
    GooglePay,
    SamsungPay,
}

impl DigitalWallet {
    pub const ALL: [DigitalWallet; 3] = [
        DigitalWallet::ApplePay,
        DigitalWallet::GooglePay,
        DigitalWallet::SamsungPay,
    ];
}

/// A debit card attached to exactly one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub account_id: Uuid,
    pub card_product_id: u32,
    pub card_number: String,
    pub balance: Decimal,
    pub transaction_limit: Decimal,
    pub status: CardStatus,
    pub expiration_date: NaiveDate,
    pub holder_name: String,
    pub digital_wallet: DigitalWallet,
    pub is_default: bool,
}

impl Card {
    /// Expired once the expiration date is strictly in the past.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date < today
    }
}

impl Record for Card {
    const COLLECTION: &'static str = "cards";

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("card_number", self.card_number.clone())]
    }
}
