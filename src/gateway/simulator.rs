use std::sync::{Arc, Mutex};

use chrono::{Duration, Months};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::{AccountSelector, Gateway, RandomActiveAccount};
use crate::clock::Clock;
use crate::domain::{Agreement, CardStatus, DigitalWallet, OperationType};
use crate::error::DepositError;
use crate::events::{
    CardMaterialized, NewCardRequested, NewDepositRequested, WithdrawalRequested,
    WithdrawalSettled,
};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

const AGREEMENT_NUMBER_LEN: usize = 20;
const CARD_NUMBER_LEN: usize = 16;
const CARD_VALIDITY_MONTHS: u32 = 60;
const MIN_TRANSACTION_LIMIT: u32 = 10_000;
const MAX_TRANSACTION_LIMIT: u32 = 99_999;

/// In-process core-banking system.
///
/// Reads the ledger the way the real system would read its own copy of
/// the data, and makes up the attributes it is responsible for: agreement
/// and card numbers, card wallet and limit, withdrawal settlements.
pub struct AbsSimulator<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
    clock: Arc<dyn Clock>,
    selector: Box<dyn AccountSelector>,
    rng: Mutex<StdRng>,
}

impl<S: LedgerStore> AbsSimulator<S> {
    pub fn new(ledger: Arc<Ledger<S>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            selector: Box::new(RandomActiveAccount),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use a fixed seed so generated numbers repeat between runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_account_selector(mut self, selector: impl AccountSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        match self.rng.lock() {
            Ok(mut rng) => f(&mut rng),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn agreement_number(&self) -> String {
        self.with_rng(|rng| {
            rng.sample_iter(&Alphanumeric)
                .take(AGREEMENT_NUMBER_LEN)
                .map(char::from)
                .collect()
        })
    }

    fn card_number(&self) -> String {
        self.with_rng(|rng| {
            let mut number = String::with_capacity(CARD_NUMBER_LEN);
            number.push(char::from(b'1' + rng.gen_range(0..9u8)));
            for _ in 1..CARD_NUMBER_LEN {
                number.push(char::from(b'0' + rng.gen_range(0..10u8)));
            }
            number
        })
    }
}

impl<S: LedgerStore> Gateway for AbsSimulator<S> {
    fn submit_deposit_request(&self, request: &NewDepositRequested) -> Result<Agreement, DepositError> {
        let card = self.ledger.card_by_number(&request.card_number)?;
        let account = self.ledger.account(card.account_id)?;
        let product = self.ledger.product(request.product_id)?;

        let start = self.clock.now();
        let end = start
            .checked_add_months(Months::new(request.duration_months))
            .map(|end| end + Duration::days(1))
            .ok_or_else(|| {
                DepositError::Rejected(format!(
                    "duration of {} months is out of range",
                    request.duration_months
                ))
            })?;

        let agreement = Agreement {
            id: Uuid::new_v4(),
            number: self.agreement_number(),
            interest_rate: request.interest_rate,
            start_date: start,
            end_date: end,
            initial_amount: request.initial_amount,
            current_balance: request.initial_amount,
            is_active: true,
            auto_renewal: request.auto_renewal,
            account_id: account.id,
            product_id: product.id,
        };
        info!(
            agreement_id = %agreement.id,
            number = %agreement.number,
            account_number = %account.account_number,
            "abs opened agreement"
        );
        Ok(agreement)
    }

    fn submit_card_request(&self, request: &NewCardRequested) -> Result<CardMaterialized, DepositError> {
        let product = self.ledger.card_product(request.product_id)?;
        let accounts = self.ledger.client_accounts(request.client_id)?;
        let account = self
            .with_rng(|rng| self.selector.select(&accounts, rng).cloned())
            .ok_or_else(|| DepositError::not_found("active account of client", request.client_id))?;

        let today = self.clock.now().date_naive();
        let expiration_date = today
            .checked_add_months(Months::new(CARD_VALIDITY_MONTHS))
            .ok_or_else(|| DepositError::Rejected("card expiration date out of range".into()))?;

        let (transaction_limit, digital_wallet) = self.with_rng(|rng| {
            let limit = rng.gen_range(MIN_TRANSACTION_LIMIT..=MAX_TRANSACTION_LIMIT);
            let wallet = DigitalWallet::ALL[rng.gen_range(0..DigitalWallet::ALL.len())];
            (Decimal::from(limit), wallet)
        });

        let card = CardMaterialized {
            account_number: account.account_number,
            card_number: self.card_number(),
            transaction_limit,
            status: CardStatus::Active,
            expiration_date,
            holder_name: holder_name(request.client_id),
            digital_wallet,
            card_product_id: product.id,
            balance: Decimal::ZERO,
        };
        info!(
            card_number = %card.card_number,
            account_number = %card.account_number,
            "abs issued card"
        );
        Ok(card)
    }

    fn submit_withdrawal_request(
        &self,
        request: &WithdrawalRequested,
    ) -> Result<WithdrawalSettled, DepositError> {
        let agreement = self.ledger.agreement(request.agreement_id)?;
        let product = self.ledger.product(agreement.product_id)?;
        let rate = product.interest_rate_early.unwrap_or(Decimal::ZERO);

        let settlement = WithdrawalSettled {
            agreement_id: agreement.id,
            account_number: request.account_number.clone(),
            is_active: false,
            current_balance: Decimal::ZERO,
            completed_at: self.clock.now(),
            sum: agreement.current_balance * rate,
            currency_code: product.currency_code,
            operation_type: OperationType::replenishment(),
        };
        info!(
            agreement_id = %settlement.agreement_id,
            sum = %settlement.sum,
            "abs settled early withdrawal"
        );
        Ok(settlement)
    }
}

fn holder_name(client_id: Uuid) -> String {
    let simple = client_id.simple().to_string().to_uppercase();
    format!("CLIENT {}", &simple[..8])
}
