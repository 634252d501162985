//! Early withdrawal: request phase, settlement phase and reconciliation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use deposit_service::domain::{CurrencyCode, OperationType, WithdrawalStatus};
use deposit_service::events::{ChannelNames, WithdrawalRequested, WithdrawalSettled};
use deposit_service::outbox::OutboxStoreExt;
use deposit_service::saga::{SettlementOutcome, WithdrawalSaga};
use deposit_service::service::CardService;
use deposit_service::{Clock, DepositError, FixedClock};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::support::{self, dec, Fixture, ACCOUNT_NUMBER, CARD_NUMBER};

fn saga(fx: &Fixture, clock: &FixedClock) -> WithdrawalSaga {
    WithdrawalSaga::new(
        fx.ledger.clone(),
        ChannelNames::default(),
        Arc::new(clock.clone()),
    )
}

fn settlement(agreement_id: Uuid, sum: &str, clock: &FixedClock) -> WithdrawalSettled {
    WithdrawalSettled {
        agreement_id,
        account_number: ACCOUNT_NUMBER.into(),
        is_active: false,
        current_balance: Decimal::ZERO,
        completed_at: clock.now(),
        sum: dec(sum),
        currency_code: CurrencyCode::RUB,
        operation_type: OperationType::replenishment(),
    }
}

const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);

#[test]
fn request_moves_agreement_balance_onto_card() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);

    let withdrawal = saga
        .request_withdrawal(fx.agreement.id, CARD_NUMBER)
        .unwrap();

    assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
    assert_eq!(withdrawal.amount, dec("500.1234"));
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("510.1234"));
    assert_eq!(
        fx.ledger.account(fx.account.id).unwrap().current_balance,
        dec("510.1234")
    );

    let requests: Vec<WithdrawalRequested> = fx
        .ledger
        .store()
        .outbox_messages()
        .unwrap()
        .iter()
        .filter(|m| m.event_type == "WithdrawalRequested")
        .map(|m| serde_json::from_str(&m.payload).unwrap())
        .collect();
    assert_eq!(
        requests,
        vec![WithdrawalRequested {
            agreement_id: fx.agreement.id,
            account_number: ACCOUNT_NUMBER.into(),
        }]
    );
}

#[test]
fn settlement_credits_sum_and_closes_agreement() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();

    let outcome = saga
        .on_settlement(settlement(fx.agreement.id, "1500", &clock))
        .unwrap();
    let SettlementOutcome::Settled { card_id, .. } = outcome else {
        panic!("expected a settled outcome, got {outcome:?}");
    };
    assert_eq!(card_id, fx.card.id);

    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("2010.1234"));
    assert_eq!(
        fx.ledger.account(fx.account.id).unwrap().current_balance,
        dec("2010.1234")
    );

    let agreement = fx.ledger.agreement(fx.agreement.id).unwrap();
    assert!(!agreement.is_active);
    assert_eq!(agreement.current_balance, Decimal::ZERO);
    assert_eq!(
        agreement.end_date,
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
    );

    let operations = fx.ledger.operations_of(fx.account.id).unwrap();
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].sum, dec("1500"));
    assert_eq!(operations[0].operation_type, OperationType::replenishment());
    assert!(operations[0]
        .details
        .as_deref()
        .unwrap()
        .contains(&fx.agreement.number));

    let record = fx.ledger.withdrawal(fx.agreement.id).unwrap().unwrap();
    assert_eq!(record.status, WithdrawalStatus::Settled);
    assert!(record.resolved_at.is_some());
}

#[test]
fn redelivered_settlement_is_skipped() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();

    let event = settlement(fx.agreement.id, "1500", &clock);
    saga.on_settlement(event.clone()).unwrap();
    let again = saga.on_settlement(event).unwrap();

    assert_eq!(again, SettlementOutcome::AlreadySettled);
    assert_eq!(fx.ledger.operations_of(fx.account.id).unwrap().len(), 1);
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("2010.1234"));
}

#[test]
fn second_request_while_pending_is_rejected() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();

    let err = saga
        .request_withdrawal(fx.agreement.id, CARD_NUMBER)
        .unwrap_err();

    assert!(matches!(err, DepositError::Rejected(_)));
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("510.1234"));
}

#[test]
fn settled_agreement_cannot_be_withdrawn_again() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();
    saga.on_settlement(settlement(fx.agreement.id, "1500", &clock))
        .unwrap();

    let err = saga
        .request_withdrawal(fx.agreement.id, CARD_NUMBER)
        .unwrap_err();
    assert!(matches!(err, DepositError::Rejected(_)));
}

#[test]
fn expired_card_is_refused_without_side_effects() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    clock.set(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    let saga = saga(&fx, &clock);

    let err = saga
        .request_withdrawal(fx.agreement.id, CARD_NUMBER)
        .unwrap_err();

    match err {
        DepositError::CardExpired { expired_on, .. } => {
            assert_eq!(expired_on, NaiveDate::from_ymd_opt(2029, 12, 31).unwrap())
        }
        other => panic!("expected CardExpired, got {other:?}"),
    }
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("10"));
    assert!(fx.ledger.withdrawal(fx.agreement.id).unwrap().is_none());
    assert!(fx.ledger.store().outbox_messages().unwrap().is_empty());
}

#[test]
fn unknown_agreement_or_card_is_not_found() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);

    let err = saga
        .request_withdrawal(Uuid::new_v4(), CARD_NUMBER)
        .unwrap_err();
    assert_eq!(err.status_code(), 404);

    let err = saga
        .request_withdrawal(fx.agreement.id, "0000000000000000")
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[test]
fn reconcile_fails_and_compensates_stale_withdrawal() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();

    clock.advance(chrono::Duration::minutes(5));
    let early = saga.reconcile(FIFTEEN_MINUTES).unwrap();
    assert!(early.failed.is_empty());

    clock.advance(chrono::Duration::minutes(11));
    let report = saga.reconcile(FIFTEEN_MINUTES).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.compensated(), 1);
    assert_eq!(report.errors, 0);
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("10"));
    assert_eq!(
        fx.ledger.account(fx.account.id).unwrap().current_balance,
        dec("10")
    );

    let record = fx.ledger.withdrawal(fx.agreement.id).unwrap().unwrap();
    assert_eq!(record.status, WithdrawalStatus::Failed);
    assert!(record.compensated);
    assert!(record.failure.is_some());

    assert!(saga.reconcile(FIFTEEN_MINUTES).unwrap().failed.is_empty());
}

#[test]
fn late_settlement_after_failure_is_rejected() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();
    clock.advance(chrono::Duration::hours(1));
    saga.reconcile(FIFTEEN_MINUTES).unwrap();

    let err = saga
        .on_settlement(settlement(fx.agreement.id, "1500", &clock))
        .unwrap_err();

    assert!(matches!(err, DepositError::Rejected(_)));
    assert!(fx.ledger.agreement(fx.agreement.id).unwrap().is_active);
    assert!(fx.ledger.operations_of(fx.account.id).unwrap().is_empty());
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("10"));
}

#[test]
fn compensated_failure_can_be_retried() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();
    clock.advance(chrono::Duration::hours(1));
    saga.reconcile(FIFTEEN_MINUTES).unwrap();

    let retry = saga
        .request_withdrawal(fx.agreement.id, CARD_NUMBER)
        .unwrap();

    assert_eq!(retry.status, WithdrawalStatus::Pending);
    assert!(!retry.compensated);
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("510.1234"));
    let stored = fx.ledger.withdrawal(fx.agreement.id).unwrap().unwrap();
    assert_eq!(stored.requested_at, clock.now());
}

#[test]
fn spent_card_leaves_failure_uncompensated() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();

    CardService::new(fx.ledger.clone(), ChannelNames::default())
        .write_off(CARD_NUMBER, dec("505"))
        .unwrap();
    clock.advance(chrono::Duration::hours(1));
    let report = saga.reconcile(FIFTEEN_MINUTES).unwrap();

    assert_eq!(report.uncompensated(), 1);
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("5.1234"));

    let err = saga
        .request_withdrawal(fx.agreement.id, CARD_NUMBER)
        .unwrap_err();
    assert!(matches!(err, DepositError::Rejected(_)));
}

#[test]
fn settlement_without_request_credits_default_card() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);

    let outcome = saga
        .on_settlement(settlement(fx.agreement.id, "42.5", &clock))
        .unwrap();

    assert!(matches!(outcome, SettlementOutcome::Settled { card_id, .. } if card_id == fx.card.id));
    assert_eq!(fx.ledger.card(fx.card.id).unwrap().balance, dec("52.5"));
    assert!(fx.ledger.withdrawal(fx.agreement.id).unwrap().is_none());
}

#[test]
fn settlement_for_unknown_account_changes_nothing() {
    let fx = support::fixture("10", "500.1234");
    let clock = support::clock();
    let saga = saga(&fx, &clock);
    saga.request_withdrawal(fx.agreement.id, CARD_NUMBER).unwrap();

    let mut event = settlement(fx.agreement.id, "1500", &clock);
    event.account_number = "40817810999999999999".into();
    let err = saga.on_settlement(event).unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert!(fx.ledger.agreement(fx.agreement.id).unwrap().is_active);
    let record = fx.ledger.withdrawal(fx.agreement.id).unwrap().unwrap();
    assert_eq!(record.status, WithdrawalStatus::Pending);
}
