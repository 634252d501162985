//! Card issuance: the bank picks the account and the card attributes.

use chrono::NaiveDate;
use deposit_service::domain::{Account, CardStatus, CurrencyCode, DigitalWallet};
use deposit_service::events::{CardMaterialized, ChannelNames, NewCardRequested};
use deposit_service::outbox::OutboxStoreExt;
use deposit_service::saga::CardIssuanceSaga;
use rust_decimal::Decimal;

use super::support::{self, dec, ACCOUNT_NUMBER};

fn materialized(account_number: &str, card_number: &str, balance: &str) -> CardMaterialized {
    CardMaterialized {
        account_number: account_number.into(),
        card_number: card_number.into(),
        transaction_limit: Decimal::from(30_000),
        status: CardStatus::Active,
        expiration_date: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
        holder_name: "CLIENT 1A2B3C4D".into(),
        digital_wallet: DigitalWallet::ApplePay,
        card_product_id: 1,
        balance: dec(balance),
    }
}

#[test]
fn request_requires_known_card_product() {
    let fx = support::fixture("0", "0");
    let saga = CardIssuanceSaga::new(fx.ledger.clone(), ChannelNames::default());

    let err = saga
        .request_card(NewCardRequested {
            client_id: fx.client_id,
            product_id: 77,
        })
        .unwrap_err();
    assert_eq!(err.status_code(), 404);

    saga.request_card(NewCardRequested {
        client_id: fx.client_id,
        product_id: 1,
    })
    .unwrap();
    let messages = fx.ledger.store().outbox_messages().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].channel, ChannelNames::default().new_card);
}

#[test]
fn first_card_of_account_becomes_default() {
    let fx = support::fixture("0", "0");
    let second = fx
        .ledger
        .open_account(Account::open(
            "40817810000000000002",
            fx.client_id,
            CurrencyCode::RUB,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        ))
        .unwrap();
    let saga = CardIssuanceSaga::new(fx.ledger.clone(), ChannelNames::default());

    saga.on_card_materialized(materialized("40817810000000000002", "4000111122223333", "0"))
        .unwrap();
    saga.on_card_materialized(materialized("40817810000000000002", "4000111122224444", "0"))
        .unwrap();

    let cards = fx.ledger.cards_of(second.id).unwrap();
    assert_eq!(cards.len(), 2);
    assert!(cards[0].is_default);
    assert!(!cards[1].is_default);
}

#[test]
fn card_balance_counts_towards_account() {
    let fx = support::fixture("10", "0");
    let saga = CardIssuanceSaga::new(fx.ledger.clone(), ChannelNames::default());

    saga.on_card_materialized(materialized(ACCOUNT_NUMBER, "4000555566667777", "90.5"))
        .unwrap();

    let card = fx.ledger.card_by_number("4000555566667777").unwrap();
    assert!(!card.is_default);
    assert_eq!(
        fx.ledger.account(fx.account.id).unwrap().current_balance,
        dec("100.5")
    );
}

#[test]
fn redelivered_card_is_skipped() {
    let fx = support::fixture("0", "0");
    let saga = CardIssuanceSaga::new(fx.ledger.clone(), ChannelNames::default());
    let event = materialized(ACCOUNT_NUMBER, "4000555566667777", "5");

    saga.on_card_materialized(event.clone()).unwrap();
    saga.on_card_materialized(event).unwrap();

    assert_eq!(fx.ledger.cards_of(fx.account.id).unwrap().len(), 2);
    assert_eq!(
        fx.ledger.account(fx.account.id).unwrap().current_balance,
        dec("5")
    );
}

#[test]
fn unknown_account_is_not_found() {
    let fx = support::fixture("0", "0");
    let saga = CardIssuanceSaga::new(fx.ledger.clone(), ChannelNames::default());

    let err = saga
        .on_card_materialized(materialized("40817810000000009999", "4000555566667777", "0"))
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert!(fx.ledger.card_by_number("4000555566667777").is_err());
}
