use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyCode {
    RUB,
    USD,
    EUR,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentSystem {
    Visa,
    Mastercard,
    Mir,
}

/// Deposit product catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub currency_code: CurrencyCode,
    /// Rate applied to the balance when the deposit is withdrawn early.
    pub interest_rate_early: Option<Decimal>,
    pub is_capitalization: bool,
    pub is_revocable: bool,
    pub is_active: bool,
    pub amount_min: Decimal,
    pub amount_max: Decimal,
    pub min_interest_rate: Decimal,
    pub max_interest_rate: Decimal,
    pub min_duration_months: u32,
    pub max_duration_months: u32,
}

impl Record for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// Card product catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProduct {
    pub id: u32,
    pub card_name: String,
    pub payment_system: PaymentSystem,
    pub currency_code: CurrencyCode,
    pub cashback: Option<Decimal>,
    pub is_virtual: bool,
    pub service_price: Decimal,
    pub product_price: Decimal,
    pub card_duration_months: Option<u32>,
    pub is_active: bool,
}

impl Record for CardProduct {
    const COLLECTION: &'static str = "card_products";

    fn id(&self) -> String {
        self.id.to_string()
    }
}
