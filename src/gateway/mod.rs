//! The core-banking system ("ABS") as seen from the deposit service.
//!
//! [`Gateway`] is the capability the sagas rely on: it materializes
//! deposits and cards and settles withdrawals. [`GatewayBridge`] puts a
//! gateway behind the bus, consuming request channels and publishing the
//! replies. [`AbsSimulator`] is the in-process stand-in used by the
//! simulation binary and the tests.

mod bridge;
mod policy;
mod simulator;

pub use bridge::GatewayBridge;
pub use policy::{AccountSelector, FirstActiveAccount, RandomActiveAccount};
pub use simulator::AbsSimulator;

use crate::domain::Agreement;
use crate::error::DepositError;
use crate::events::{
    AutoRenewalToggled, CardMaterialized, CardStatusChanged, NewCardRequested,
    NewDepositRequested, PinCodeChangeRequested, WithdrawalRequested, WithdrawalSettled,
};

/// Requests the deposit service makes of the core-banking system.
pub trait Gateway: Send + Sync {
    /// Open the agreement described by a validated deposit request.
    fn submit_deposit_request(&self, request: &NewDepositRequested) -> Result<Agreement, DepositError>;

    /// Issue a card of the requested product to one of the client's accounts.
    fn submit_card_request(&self, request: &NewCardRequested) -> Result<CardMaterialized, DepositError>;

    /// Close an agreement early and report the final settlement.
    fn submit_withdrawal_request(
        &self,
        request: &WithdrawalRequested,
    ) -> Result<WithdrawalSettled, DepositError>;

    /// A client changed a card status. No reply is expected.
    fn notify_card_status(&self, _change: &CardStatusChanged) -> Result<(), DepositError> {
        Ok(())
    }

    /// A client toggled auto-renewal. No reply is expected.
    fn notify_auto_renewal(&self, _toggle: &AutoRenewalToggled) -> Result<(), DepositError> {
        Ok(())
    }

    /// A client asked for a new card PIN. No reply is expected.
    fn notify_pin_code_change(&self, _request: &PinCodeChangeRequested) -> Result<(), DepositError> {
        Ok(())
    }
}
