use std::sync::Arc;
use std::time::Duration;

use chrono::Months;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::{Account, Operation, Withdrawal, WithdrawalStatus};
use crate::error::DepositError;
use crate::events::{ChannelNames, WithdrawalRequested, WithdrawalSettled};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore, Versioned};

/// What a settlement delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled { operation_id: Uuid, card_id: Uuid },
    /// The withdrawal was settled by an earlier delivery.
    AlreadySettled,
}

/// Withdrawals failed by one [`WithdrawalSaga::reconcile`] run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    pub failed: Vec<Withdrawal>,
    /// Stale withdrawals that could not be resolved this run.
    pub errors: usize,
}

impl ReconcileReport {
    pub fn compensated(&self) -> usize {
        self.failed.iter().filter(|w| w.compensated).count()
    }

    pub fn uncompensated(&self) -> usize {
        self.failed.len() - self.compensated()
    }
}

/// Early withdrawal (revocation) of a deposit.
///
/// The request phase moves the agreement balance onto a card, records a
/// PENDING [`Withdrawal`] and emits the request, all in one commit. The
/// settlement phase deactivates the agreement, credits the settled sum and
/// writes the [`Operation`], again in one commit. A withdrawal whose
/// settlement never arrives is failed and compensated by
/// [`reconcile`](WithdrawalSaga::reconcile).
pub struct WithdrawalSaga<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
    channels: ChannelNames,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> WithdrawalSaga<S> {
    pub fn new(ledger: Arc<Ledger<S>>, channels: ChannelNames, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            channels,
            clock,
        }
    }

    /// Move the agreement's current balance onto the card and ask the bank
    /// to settle. The card balance changes immediately.
    pub fn request_withdrawal(
        &self,
        agreement_id: Uuid,
        card_number: &str,
    ) -> Result<Withdrawal, DepositError> {
        let now = self.clock.now();

        let card = self.ledger.card_by_number(card_number)?;
        if card.is_expired(now.date_naive()) {
            return Err(DepositError::CardExpired {
                card_number: card.card_number,
                expired_on: card.expiration_date,
            });
        }
        self.ledger.agreement(agreement_id)?;

        let withdrawal = self.ledger.transaction(|tx| {
            let previous = tx.withdrawal_for_update(agreement_id)?;
            if let Some(previous) = &previous {
                ensure_retryable(&previous.data)?;
            }

            let agreement = tx.agreement_for_update(agreement_id)?;
            let mut card = tx.card_by_number_for_update(card_number)?;
            let account = tx.ledger().account(card.data.account_id)?;

            let amount = agreement.data.current_balance;
            card.data.balance += amount;

            let withdrawal = Withdrawal {
                agreement_id,
                card_id: card.data.id,
                card_number: card.data.card_number.clone(),
                account_number: account.account_number.clone(),
                amount,
                status: WithdrawalStatus::Pending,
                compensated: false,
                requested_at: now,
                resolved_at: None,
                failure: None,
            };
            tx.put_card(card);
            match previous {
                Some(previous) => tx.put_withdrawal(Versioned {
                    data: withdrawal.clone(),
                    version: previous.version,
                })?,
                None => tx.insert_withdrawal(&withdrawal)?,
            }

            tx.enqueue_correlated(
                &self.channels,
                &WithdrawalRequested {
                    agreement_id,
                    account_number: account.account_number,
                },
                agreement_id.to_string(),
            )?;
            Ok(withdrawal)
        })?;

        info!(
            agreement_id = %agreement_id,
            card_number = %withdrawal.card_number,
            amount = %withdrawal.amount,
            "early withdrawal requested"
        );
        Ok(withdrawal)
    }

    /// Apply the bank's settlement. Failures are logged here and returned;
    /// the request phase is not rolled back by them.
    pub fn on_settlement(&self, event: WithdrawalSettled) -> Result<SettlementOutcome, DepositError> {
        let agreement_id = event.agreement_id;
        let account_number = event.account_number.clone();

        match self.settle(event) {
            Ok(SettlementOutcome::AlreadySettled) => {
                warn!(agreement_id = %agreement_id, "withdrawal already settled, skipping");
                Ok(SettlementOutcome::AlreadySettled)
            }
            Ok(outcome @ SettlementOutcome::Settled { operation_id, card_id }) => {
                info!(
                    agreement_id = %agreement_id,
                    account_number = %account_number,
                    operation_id = %operation_id,
                    card_id = %card_id,
                    "early withdrawal settled"
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    agreement_id = %agreement_id,
                    account_number = %account_number,
                    error = %err,
                    "withdrawal settlement failed"
                );
                Err(err)
            }
        }
    }

    fn settle(&self, event: WithdrawalSettled) -> Result<SettlementOutcome, DepositError> {
        let now = self.clock.now();
        let end_date = now
            .checked_add_months(Months::new(12))
            .ok_or_else(|| DepositError::Rejected("agreement end date out of range".into()))?;

        self.ledger.transaction(|tx| {
            let record = tx.withdrawal_for_update(event.agreement_id)?;
            if let Some(record) = &record {
                match record.data.status {
                    WithdrawalStatus::Pending => {}
                    WithdrawalStatus::Settled => return Ok(SettlementOutcome::AlreadySettled),
                    WithdrawalStatus::Failed => {
                        return Err(DepositError::Rejected(format!(
                            "settlement of agreement {} arrived after the withdrawal failed",
                            event.agreement_id
                        )))
                    }
                }
            }

            let account = tx.ledger().account_by_number(&event.account_number)?;
            let mut agreement = tx.agreement_for_update(event.agreement_id)?;
            let card_id = settlement_card(tx.ledger(), &account, record.as_ref().map(|r| &r.data))?;
            let mut card = tx.card_for_update(card_id)?;

            card.data.balance += event.sum;
            tx.put_card(card);

            agreement.data.is_active = false;
            agreement.data.current_balance = event.current_balance;
            agreement.data.end_date = end_date;
            let number = agreement.data.number.clone();
            tx.put_agreement(agreement)?;

            let operation = Operation {
                id: Uuid::new_v4(),
                account_id: account.id,
                completed_at: event.completed_at,
                sum: event.sum,
                currency_code: event.currency_code,
                details: Some(format!("Early withdrawal of deposit agreement {number}")),
                operation_type: event.operation_type.clone(),
            };
            tx.append_operation(&operation)?;

            if let Some(mut record) = record {
                record.data.settle(now);
                tx.put_withdrawal(record)?;
            }

            Ok(SettlementOutcome::Settled {
                operation_id: operation.id,
                card_id,
            })
        })
    }

    /// Fail PENDING withdrawals requested more than `timeout` ago and take
    /// the moved amount back off their cards.
    pub fn reconcile(&self, timeout: Duration) -> Result<ReconcileReport, DepositError> {
        let now = self.clock.now();
        let age = chrono::Duration::from_std(timeout).map_err(|_| {
            DepositError::Rejected(format!("reconciliation timeout {timeout:?} is out of range"))
        })?;
        let cutoff = now - age;

        let mut report = ReconcileReport::default();
        let stale = self
            .ledger
            .withdrawals_in(WithdrawalStatus::Pending)?
            .into_iter()
            .filter(|w| w.requested_at <= cutoff);

        for withdrawal in stale {
            match self.fail_stale(withdrawal.agreement_id, cutoff, now) {
                Ok(Some(failed)) if failed.compensated => {
                    warn!(
                        agreement_id = %failed.agreement_id,
                        card_number = %failed.card_number,
                        amount = %failed.amount,
                        "stale withdrawal failed and compensated"
                    );
                    report.failed.push(failed);
                }
                Ok(Some(failed)) => {
                    error!(
                        agreement_id = %failed.agreement_id,
                        card_number = %failed.card_number,
                        amount = %failed.amount,
                        "stale withdrawal failed, card no longer holds the amount"
                    );
                    report.failed.push(failed);
                }
                Ok(None) => {}
                Err(err) => {
                    report.errors += 1;
                    error!(
                        agreement_id = %withdrawal.agreement_id,
                        error = %err,
                        "reconciliation of withdrawal failed"
                    );
                }
            }
        }
        Ok(report)
    }

    fn fail_stale(
        &self,
        agreement_id: Uuid,
        cutoff: chrono::DateTime<chrono::Utc>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Withdrawal>, DepositError> {
        self.ledger.transaction(|tx| {
            let Some(mut record) = tx.withdrawal_for_update(agreement_id)? else {
                return Ok(None);
            };
            if !record.data.is_pending() || record.data.requested_at > cutoff {
                return Ok(None);
            }

            let amount = record.data.amount;
            let compensated = match tx.card_for_update(record.data.card_id) {
                Ok(mut card) if card.data.balance >= amount => {
                    card.data.balance -= amount;
                    tx.put_card(card);
                    true
                }
                Ok(_) | Err(DepositError::NotFound { .. }) => false,
                Err(err) => return Err(err),
            };

            record
                .data
                .fail(now, "settlement not received in time", compensated);
            let failed = record.data.clone();
            tx.put_withdrawal(record)?;
            Ok(Some(failed))
        })
    }
}

fn ensure_retryable(previous: &Withdrawal) -> Result<(), DepositError> {
    match previous.status {
        WithdrawalStatus::Pending => Err(DepositError::Rejected(format!(
            "withdrawal of agreement {} is still pending",
            previous.agreement_id
        ))),
        WithdrawalStatus::Settled => Err(DepositError::Rejected(format!(
            "agreement {} is already withdrawn",
            previous.agreement_id
        ))),
        WithdrawalStatus::Failed if !previous.compensated => Err(DepositError::Rejected(format!(
            "failed withdrawal of agreement {} was never compensated",
            previous.agreement_id
        ))),
        WithdrawalStatus::Failed => Ok(()),
    }
}

/// The card credited by a settlement: the withdrawal's own card when it
/// belongs to the settled account, else the account's default card, else
/// its first card.
fn settlement_card<S: LedgerStore>(
    ledger: &Ledger<S>,
    account: &Account,
    withdrawal: Option<&Withdrawal>,
) -> Result<Uuid, DepositError> {
    if let Some(withdrawal) = withdrawal {
        match ledger.card(withdrawal.card_id) {
            Ok(card) if card.account_id == account.id => return Ok(card.id),
            Ok(_) | Err(DepositError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    let cards = ledger.cards_of(account.id)?;
    cards
        .iter()
        .find(|c| c.is_default)
        .or_else(|| cards.first())
        .map(|c| c.id)
        .ok_or_else(|| DepositError::not_found("card of account", &account.account_number))
}
