//! Card status transitions from the client and from the bank.

use deposit_service::domain::CardStatus;
use deposit_service::events::{CardStatusChanged, CardStatusCommand, ChannelNames};
use deposit_service::outbox::OutboxStoreExt;
use deposit_service::saga::CardStatusMachine;
use deposit_service::DepositError;
use uuid::Uuid;

use super::support::{self, CARD_NUMBER};

#[test]
fn client_block_is_reported_to_bank() {
    let fx = support::fixture("0", "0");
    let machine = CardStatusMachine::new(fx.ledger.clone(), ChannelNames::default());

    let card = machine
        .change_status(fx.client_id, CARD_NUMBER, CardStatus::Blocked)
        .unwrap();

    assert_eq!(card.status, CardStatus::Blocked);
    let messages = fx.ledger.store().outbox_messages().unwrap();
    assert_eq!(messages.len(), 1);
    let changed: CardStatusChanged = serde_json::from_str(&messages[0].payload).unwrap();
    assert_eq!(
        changed,
        CardStatusChanged {
            card_id: fx.card.id,
            new_status: CardStatus::Blocked,
        }
    );
}

#[test]
fn same_status_is_refused() {
    let fx = support::fixture("0", "0");
    let machine = CardStatusMachine::new(fx.ledger.clone(), ChannelNames::default());
    machine
        .change_status(fx.client_id, CARD_NUMBER, CardStatus::Blocked)
        .unwrap();

    let err = machine
        .change_status(fx.client_id, CARD_NUMBER, CardStatus::Blocked)
        .unwrap_err();

    assert!(matches!(
        err,
        DepositError::DuplicateStatus { status: CardStatus::Blocked, .. }
    ));
    assert_eq!(fx.ledger.store().outbox_messages().unwrap().len(), 1);
}

#[test]
fn closed_card_can_be_reactivated() {
    let fx = support::fixture("0", "0");
    let machine = CardStatusMachine::new(fx.ledger.clone(), ChannelNames::default());

    machine
        .change_status(fx.client_id, CARD_NUMBER, CardStatus::Closed)
        .unwrap();
    let card = machine
        .change_status(fx.client_id, CARD_NUMBER, CardStatus::Active)
        .unwrap();

    assert_eq!(card.status, CardStatus::Active);
}

#[test]
fn foreign_card_is_not_found() {
    let fx = support::fixture("0", "0");
    let machine = CardStatusMachine::new(fx.ledger.clone(), ChannelNames::default());

    let err = machine
        .change_status(Uuid::new_v4(), CARD_NUMBER, CardStatus::Blocked)
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().status, CardStatus::Active);
}

#[test]
fn bank_command_changes_status_silently() {
    let fx = support::fixture("0", "0");
    let machine = CardStatusMachine::new(fx.ledger.clone(), ChannelNames::default());

    machine
        .on_status_command(CardStatusCommand {
            card_id: fx.card.id,
            new_status: CardStatus::Closed,
        })
        .unwrap();

    assert_eq!(fx.ledger.card(fx.card.id).unwrap().status, CardStatus::Closed);
    assert!(fx.ledger.store().outbox_messages().unwrap().is_empty());
}
