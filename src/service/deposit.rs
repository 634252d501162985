use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::{Agreement, Operation, OperationType};
use crate::error::DepositError;
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

pub struct DepositService<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> DepositService<S> {
    pub fn new(ledger: Arc<Ledger<S>>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    pub fn active_deposits(&self, client_id: Uuid) -> Result<Vec<Agreement>, DepositError> {
        let mut agreements = self.ledger.client_agreements(client_id)?;
        agreements.retain(|a| a.is_active);
        Ok(agreements)
    }

    pub fn deposit(&self, client_id: Uuid, agreement_id: Uuid) -> Result<Agreement, DepositError> {
        self.ledger.client_agreement(client_id, agreement_id)
    }

    /// Credit `sum` to the account's default card and record the refill.
    pub fn refill(
        &self,
        client_id: Uuid,
        account_number: &str,
        sum: Decimal,
        details: Option<String>,
    ) -> Result<Operation, DepositError> {
        if sum <= Decimal::ZERO {
            return Err(DepositError::Rejected(format!(
                "refill sum must be positive, got {sum}"
            )));
        }

        let account = self.ledger.account_by_number(account_number)?;
        if account.client_id != client_id {
            return Err(DepositError::not_found("account", account_number));
        }
        let card_id = self
            .ledger
            .cards_of(account.id)?
            .into_iter()
            .find(|c| c.is_default)
            .map(|c| c.id)
            .ok_or_else(|| DepositError::not_found("default card of account", account_number))?;

        let operation = Operation {
            id: Uuid::new_v4(),
            account_id: account.id,
            completed_at: self.clock.now(),
            sum,
            currency_code: account.currency_code,
            details,
            operation_type: OperationType::refill(),
        };

        self.ledger.transaction(|tx| {
            let mut card = tx.card_for_update(card_id)?;
            card.data.balance += sum;
            tx.put_card(card);
            tx.append_operation(&operation)
        })?;

        info!(account_number = %account_number, sum = %sum, "account refilled");
        Ok(operation)
    }
}
