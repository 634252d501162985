//! Deposit creation: client request, then the bank's materialized agreement.

use deposit_service::events::{ChannelNames, DepositMaterialized, NewDepositRequested};
use deposit_service::outbox::OutboxStoreExt;
use deposit_service::saga::DepositSaga;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::support::{self, CARD_NUMBER};

fn request(card_number: &str, product_id: u32) -> NewDepositRequested {
    NewDepositRequested {
        product_id,
        initial_amount: Decimal::from(25_000),
        card_number: card_number.into(),
        auto_renewal: true,
        interest_rate: Decimal::from(8),
        duration_months: 6,
    }
}

#[test]
fn request_is_emitted_on_new_deposit_channel() {
    let fx = support::fixture("0", "0");
    let channels = ChannelNames::default();
    let saga = DepositSaga::new(fx.ledger.clone(), channels.clone());

    let message_id = saga
        .request_deposit(fx.client_id, request(CARD_NUMBER, 1))
        .unwrap();

    let messages = fx.ledger.store().outbox_messages().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, message_id);
    assert_eq!(messages[0].channel, channels.new_deposit);
    assert_eq!(messages[0].event_type, "NewDepositRequested");
    assert_eq!(messages[0].correlation_id.as_deref(), Some(CARD_NUMBER));
}

#[test]
fn request_does_not_create_agreement() {
    let fx = support::fixture("0", "0");
    let saga = DepositSaga::new(fx.ledger.clone(), ChannelNames::default());

    saga.request_deposit(fx.client_id, request(CARD_NUMBER, 1))
        .unwrap();

    assert_eq!(fx.ledger.client_agreements(fx.client_id).unwrap().len(), 1);
}

#[test]
fn invalid_requests_emit_nothing() {
    let fx = support::fixture("0", "0");
    let saga = DepositSaga::new(fx.ledger.clone(), ChannelNames::default());

    let unknown_card = saga
        .request_deposit(fx.client_id, request("9999888877776666", 1))
        .unwrap_err();
    let foreign_card = saga
        .request_deposit(Uuid::new_v4(), request(CARD_NUMBER, 1))
        .unwrap_err();
    let unknown_product = saga
        .request_deposit(fx.client_id, request(CARD_NUMBER, 404))
        .unwrap_err();

    for err in [unknown_card, foreign_card, unknown_product] {
        assert_eq!(err.status_code(), 404, "{err}");
    }
    assert!(fx.ledger.store().outbox_messages().unwrap().is_empty());
}

#[test]
fn materialized_agreement_is_persisted_once() {
    let fx = support::fixture("0", "0");
    let saga = DepositSaga::new(fx.ledger.clone(), ChannelNames::default());
    let agreement = support::agreement(fx.account.id, 1, Decimal::from(25_000));

    saga.on_deposit_materialized(DepositMaterialized(agreement.clone()))
        .unwrap();
    saga.on_deposit_materialized(DepositMaterialized(agreement.clone()))
        .unwrap();

    let mut renumbered = support::agreement(fx.account.id, 1, Decimal::from(1));
    renumbered.number = agreement.number.clone();
    saga.on_deposit_materialized(DepositMaterialized(renumbered.clone()))
        .unwrap();

    assert_eq!(fx.ledger.agreement(agreement.id).unwrap(), agreement);
    assert!(fx.ledger.agreement(renumbered.id).is_err());
    assert_eq!(fx.ledger.client_agreements(fx.client_id).unwrap().len(), 2);
}
