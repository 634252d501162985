//! Runs the deposit service against the in-process core-banking simulator:
//! issues a card, opens a deposit, toggles auto-renewal and withdraws the
//! deposit early, logging every step.

use std::sync::Arc;

use chrono::Months;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use deposit_service::domain::{
    Account, CardProduct, CardStatus, CurrencyCode, PaymentSystem, Product,
};
use deposit_service::events::{NewCardRequested, NewDepositRequested};
use deposit_service::{telemetry, Clock, DepositConfig, DepositError, DepositSystem, SystemClock};

fn main() -> Result<(), DepositError> {
    telemetry::init("info");

    let config = DepositConfig::from_env()?;
    let clock = Arc::new(SystemClock);
    let system = DepositSystem::simulated(config, clock.clone(), None);

    let client_id = Uuid::new_v4();
    seed(&system, client_id, clock.as_ref())?;

    system.card_issuance().request_card(NewCardRequested {
        client_id,
        product_id: 1,
    })?;
    system.run_until_idle()?;

    let card = system
        .accounts()
        .accounts_with_cards(client_id)?
        .into_iter()
        .flat_map(|a| a.cards)
        .next()
        .ok_or_else(|| DepositError::not_found("card of client", client_id))?;
    info!(card_number = %card.card_number, limit = %card.transaction_limit, "card ready");

    system.deposits().request_deposit(
        client_id,
        NewDepositRequested {
            product_id: 1,
            initial_amount: Decimal::from(50_000),
            card_number: card.card_number.clone(),
            auto_renewal: false,
            interest_rate: Decimal::new(75, 1),
            duration_months: 12,
        },
    )?;
    system.run_until_idle()?;

    let agreement = system
        .deposit_service()
        .active_deposits(client_id)?
        .into_iter()
        .next()
        .ok_or_else(|| DepositError::not_found("deposit of client", client_id))?;
    info!(number = %agreement.number, end_date = %agreement.end_date, "deposit opened");

    system.auto_renewal().toggle(client_id, agreement.id, true)?;
    system
        .card_status()
        .change_status(client_id, &card.card_number, CardStatus::Blocked)?;
    system
        .card_status()
        .change_status(client_id, &card.card_number, CardStatus::Active)?;

    system
        .withdrawals()
        .request_withdrawal(agreement.id, &card.card_number)?;
    let stats = system.run_until_idle()?;

    let account = system.ledger().account(card.account_id)?;
    let operations = system.ledger().operations_of(account.id)?;
    info!(
        account_number = %account.account_number,
        balance = %account.current_balance,
        operations = operations.len(),
        relayed = stats.relayed,
        "early withdrawal settled"
    );
    Ok(())
}

fn seed(system: &DepositSystem, client_id: Uuid, clock: &dyn Clock) -> Result<(), DepositError> {
    let ledger = system.ledger();
    let today = clock.now().date_naive();

    ledger.add_product(&Product {
        id: 1,
        name: "Revocable savings".into(),
        currency_code: CurrencyCode::RUB,
        interest_rate_early: Some(Decimal::new(102, 2)),
        is_capitalization: false,
        is_revocable: true,
        is_active: true,
        amount_min: Decimal::from(10_000),
        amount_max: Decimal::from(5_000_000),
        min_interest_rate: Decimal::from(5),
        max_interest_rate: Decimal::from(9),
        min_duration_months: 3,
        max_duration_months: 36,
    })?;
    ledger.add_card_product(&CardProduct {
        id: 1,
        card_name: "Everyday debit".into(),
        payment_system: PaymentSystem::Mir,
        currency_code: CurrencyCode::RUB,
        cashback: Some(Decimal::new(1, 2)),
        is_virtual: false,
        service_price: Decimal::ZERO,
        product_price: Decimal::ZERO,
        card_duration_months: Some(60),
        is_active: true,
    })?;

    let opened = today.checked_sub_months(Months::new(6)).unwrap_or(today);
    ledger.open_account(Account::open(
        "40817810099910004312",
        client_id,
        CurrencyCode::RUB,
        opened,
    ))?;
    Ok(())
}
