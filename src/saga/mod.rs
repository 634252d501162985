//! Saga steps.
//!
//! Every step is one ledger transaction: the rows it touches are locked,
//! its writes and the events it emits (as outbox messages) commit
//! together, and a failure leaves nothing behind. Steps that answer a
//! gateway reply are registered on the reply router by
//! [`DepositSystem`](crate::system::DepositSystem).
//!
//! | Flow | Client step | Reply step |
//! |---|---|---|
//! | deposit creation | [`DepositSaga::request_deposit`] | [`DepositSaga::on_deposit_materialized`] |
//! | card issuance | [`CardIssuanceSaga::request_card`] | [`CardIssuanceSaga::on_card_materialized`] |
//! | early withdrawal | [`WithdrawalSaga::request_withdrawal`] | [`WithdrawalSaga::on_settlement`] |
//! | card status | [`CardStatusMachine::change_status`] | [`CardStatusMachine::on_status_command`] |
//! | auto-renewal | [`AutoRenewalToggle::toggle`] | none |

mod auto_renewal;
mod card_issuance;
mod card_status;
mod deposit;
mod withdrawal;

pub use auto_renewal::AutoRenewalToggle;
pub use card_issuance::CardIssuanceSaga;
pub use card_status::{check_transition, CardStatusMachine, Notify};
pub use deposit::DepositSaga;
pub use withdrawal::{ReconcileReport, SettlementOutcome, WithdrawalSaga};

use crate::error::DepositError;
use crate::ledger::StoreError;

/// A commit refused because the record already exists, as happens when a
/// reply is delivered twice.
fn is_duplicate_insert(err: &DepositError) -> bool {
    matches!(
        err,
        DepositError::Store(StoreError::Duplicate { .. } | StoreError::UniqueViolation { .. })
    )
}
