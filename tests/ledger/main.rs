//! Ledger Tests
//!
//! Transactions against the in-memory store: atomicity, row locking and
//! the derived account balance.

mod status;

use chrono::NaiveDate;
use deposit_service::domain::{Account, Card, CardStatus, CurrencyCode, DigitalWallet};
use deposit_service::Ledger;
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn ledger_with_account() -> (Ledger, Account) {
    let ledger = Ledger::in_memory();
    let account = ledger
        .open_account(Account::open(
            "40817810000000000042",
            Uuid::new_v4(),
            CurrencyCode::EUR,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        ))
        .unwrap();
    (ledger, account)
}

pub fn card(account_id: Uuid, number: &str, balance: Decimal, is_default: bool) -> Card {
    Card {
        id: Uuid::new_v4(),
        account_id,
        card_product_id: 1,
        card_number: number.into(),
        balance,
        transaction_limit: Decimal::from(1_000),
        status: CardStatus::Active,
        expiration_date: NaiveDate::from_ymd_opt(2031, 1, 31).unwrap(),
        holder_name: "MARIA SILVA".into(),
        digital_wallet: DigitalWallet::GooglePay,
        is_default,
    }
}
