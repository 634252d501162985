//! The whole service wired to the simulated core-banking system.
//!
//! ```text
//!  client ──▶ saga ──▶ outbox ──▶ relay ──▶ request channel ──▶ AbsSimulator
//!                                                                   │
//!  ledger ◀── saga handler ◀── reply channel ◀──────────────────────┘
//! ```

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use deposit_service::domain::{Account, CardStatus, CurrencyCode};
use deposit_service::events::{NewCardRequested, NewDepositRequested, PinCodeChangeRequested};
use deposit_service::{DepositConfig, DepositSystem, FixedClock};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::support::{self, dec, ACCOUNT_NUMBER, CARD_NUMBER};

fn simulated(clock: &FixedClock) -> (DepositSystem, Uuid) {
    let config = DepositConfig {
        record_sent_events: true,
        ..DepositConfig::default()
    };
    let system = DepositSystem::simulated(config, Arc::new(clock.clone()), Some(7));
    let ledger = system.ledger();
    ledger.add_product(&support::product(1, Some("1.02"))).unwrap();
    ledger.add_card_product(&support::card_product(1)).unwrap();

    let client_id = Uuid::new_v4();
    ledger
        .open_account(Account::open(
            ACCOUNT_NUMBER,
            client_id,
            CurrencyCode::RUB,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        ))
        .unwrap();
    (system, client_id)
}

#[test]
fn card_deposit_and_early_withdrawal_round_trip() {
    let clock = support::clock();
    let (system, client_id) = simulated(&clock);

    system
        .card_issuance()
        .request_card(NewCardRequested {
            client_id,
            product_id: 1,
        })
        .unwrap();
    let stats = system.run_until_idle().unwrap();
    assert_eq!(stats.failures, 0);

    let cards = system.cards().client_cards(client_id).unwrap();
    assert_eq!(cards.len(), 1);
    let card = cards[0].clone();
    assert!(card.is_default);
    assert_eq!(card.card_number.len(), 16);
    assert!(card.holder_name.starts_with("CLIENT "));

    system
        .deposit_service()
        .refill(client_id, ACCOUNT_NUMBER, Decimal::from(300), None)
        .unwrap();

    system
        .deposits()
        .request_deposit(
            client_id,
            NewDepositRequested {
                product_id: 1,
                initial_amount: Decimal::from(1_000),
                card_number: card.card_number.clone(),
                auto_renewal: false,
                interest_rate: Decimal::from(6),
                duration_months: 12,
            },
        )
        .unwrap();
    system.run_until_idle().unwrap();

    let deposits = system.deposit_service().active_deposits(client_id).unwrap();
    assert_eq!(deposits.len(), 1);
    let agreement = deposits[0].clone();
    assert_eq!(agreement.current_balance, Decimal::from(1_000));
    assert_eq!(agreement.number.len(), 20);

    system
        .auto_renewal()
        .toggle(client_id, agreement.id, true)
        .unwrap();
    system
        .withdrawals()
        .request_withdrawal(agreement.id, &card.card_number)
        .unwrap();
    assert_eq!(
        system.ledger().card(card.id).unwrap().balance,
        Decimal::from(1_300)
    );

    let stats = system.run_until_idle().unwrap();
    assert_eq!(stats.failures, 0);

    let card = system.ledger().card(card.id).unwrap();
    assert_eq!(card.balance, dec("2320"));
    let account = system.ledger().account_by_number(ACCOUNT_NUMBER).unwrap();
    assert_eq!(account.current_balance, card.balance);
    assert!(!system.ledger().agreement(agreement.id).unwrap().is_active);
    assert!(system
        .deposit_service()
        .active_deposits(client_id)
        .unwrap()
        .is_empty());
    assert_eq!(system.ledger().operations_of(account.id).unwrap().len(), 2);

    let channels = &system.config().channels;
    assert_eq!(system.queue().sent(&channels.auto_renewal).len(), 1);
    assert_eq!(system.queue().sent(&channels.withdrawal_settled).len(), 1);
}

#[test]
fn pin_change_reaches_the_bank_once() {
    let clock = support::clock();
    let (system, client_id) = simulated(&clock);
    system
        .card_issuance()
        .request_card(NewCardRequested {
            client_id,
            product_id: 1,
        })
        .unwrap();
    system.run_until_idle().unwrap();
    let card = system.cards().client_cards(client_id).unwrap()[0].clone();

    system
        .cards()
        .change_pin_code(client_id, &card.card_number, "9090")
        .unwrap();
    let stats = system.run_until_idle().unwrap();
    assert_eq!(stats.failures, 0);

    let channels = &system.config().channels;
    let sent: Vec<PinCodeChangeRequested> = system.queue().sent_as(&channels.new_pin_code).unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].card_number, card.card_number);
    assert_eq!(system.queue().pending(&channels.new_pin_code), 0);
}

#[test]
fn gateway_failure_is_counted_and_leaves_ledger_untouched() {
    let clock = support::clock();
    let (system, _) = simulated(&clock);
    let stranger = Uuid::new_v4();

    system
        .card_issuance()
        .request_card(NewCardRequested {
            client_id: stranger,
            product_id: 1,
        })
        .unwrap();
    let stats = system.run_until_idle().unwrap();

    assert_eq!(stats.failures, 1);
    assert!(system.cards().client_cards(stranger).unwrap().is_empty());
}

#[test]
fn bank_status_push_is_applied_without_echo() {
    let clock = support::clock();
    let (system, client_id) = simulated(&clock);
    system
        .card_issuance()
        .request_card(NewCardRequested {
            client_id,
            product_id: 1,
        })
        .unwrap();
    system.run_until_idle().unwrap();
    let card = system.cards().client_cards(client_id).unwrap()[0].clone();

    system
        .gateway()
        .unwrap()
        .push_card_status(card.id, CardStatus::Blocked)
        .unwrap();
    system.run_until_idle().unwrap();

    assert_eq!(
        system.ledger().card(card.id).unwrap().status,
        CardStatus::Blocked
    );
    let outbound = &system.config().channels.card_status_outbound;
    assert!(system.queue().sent(outbound).is_empty());
}

#[test]
fn unanswered_withdrawal_is_compensated_by_reconcile() {
    let clock = support::clock();
    let config = DepositConfig {
        withdrawal_timeout_secs: 60,
        ..DepositConfig::default()
    };
    let system = DepositSystem::in_memory(config, Arc::new(clock.clone()));
    let ledger = system.ledger();
    ledger.add_product(&support::product(1, None)).unwrap();
    let account = ledger
        .open_account(Account::open(
            ACCOUNT_NUMBER,
            Uuid::new_v4(),
            CurrencyCode::RUB,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        ))
        .unwrap();
    let card = ledger
        .add_card(support::card(account.id, CARD_NUMBER, dec("10"), true))
        .unwrap();
    let agreement = support::agreement(account.id, 1, dec("500.1234"));
    ledger.transaction(|tx| tx.insert_agreement(&agreement)).unwrap();

    system
        .withdrawals()
        .request_withdrawal(agreement.id, CARD_NUMBER)
        .unwrap();
    system.run_until_idle().unwrap();
    assert_eq!(ledger.card(card.id).unwrap().balance, dec("510.1234"));

    clock.advance(chrono::Duration::minutes(2));
    let report = system.reconcile().unwrap();

    assert_eq!(report.compensated(), 1);
    assert_eq!(ledger.card(card.id).unwrap().balance, dec("10"));
    assert!(ledger.agreement(agreement.id).unwrap().is_active);
}

#[test]
fn background_workers_issue_card() {
    let clock = support::clock();
    let (system, client_id) = simulated(&clock);
    let running = system.spawn();

    system
        .card_issuance()
        .request_card(NewCardRequested {
            client_id,
            product_id: 1,
        })
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut cards = Vec::new();
    while Instant::now() < deadline {
        cards = system.cards().client_cards(client_id).unwrap();
        if !cards.is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    let stats = running.stop();
    assert_eq!(cards.len(), 1);
    assert!(stats.relay.messages_published >= 1);
    assert!(stats.gateway.unwrap().handled >= 1);
    assert!(stats.replies.handled >= 1);
}
