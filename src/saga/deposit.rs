use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::is_duplicate_insert;
use crate::domain::Agreement;
use crate::error::DepositError;
use crate::events::{ChannelNames, DepositMaterialized, NewDepositRequested};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

/// Deposit creation.
///
/// The client step only validates and emits; the agreement exists once
/// the bank's reply has been consumed. Callers must not expect to find it
/// right after [`request_deposit`](Self::request_deposit) returns.
pub struct DepositSaga<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
    channels: ChannelNames,
}

impl<S: LedgerStore> DepositSaga<S> {
    pub fn new(ledger: Arc<Ledger<S>>, channels: ChannelNames) -> Self {
        Self { ledger, channels }
    }

    /// Validate the request against the client's cards and the product
    /// catalog, then emit it. Returns the outbox message id.
    pub fn request_deposit(
        &self,
        client_id: Uuid,
        request: NewDepositRequested,
    ) -> Result<String, DepositError> {
        self.ledger
            .client_card_by_number(client_id, &request.card_number)?;
        self.ledger.product(request.product_id)?;

        let message_id = self.ledger.transaction(|tx| {
            tx.enqueue_correlated(&self.channels, &request, request.card_number.clone())
        })?;

        info!(
            client_id = %client_id,
            product_id = request.product_id,
            card_number = %request.card_number,
            message_id = %message_id,
            "deposit request accepted"
        );
        Ok(message_id)
    }

    /// Persist the agreement the bank materialized. A redelivered agreement
    /// is skipped.
    pub fn on_deposit_materialized(&self, event: DepositMaterialized) -> Result<(), DepositError> {
        let DepositMaterialized(agreement) = event;
        let (id, number) = (agreement.id, agreement.number.clone());

        if self.already_persisted(&agreement)? {
            warn!(agreement_id = %id, number = %number, "agreement already persisted, skipping");
            return Ok(());
        }

        match self.ledger.transaction(|tx| tx.insert_agreement(&agreement)) {
            Ok(()) => {
                info!(
                    agreement_id = %id,
                    number = %number,
                    account_id = %agreement.account_id,
                    "deposit agreement persisted"
                );
                Ok(())
            }
            Err(err) if is_duplicate_insert(&err) => {
                warn!(agreement_id = %id, number = %number, "agreement already persisted, skipping");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn already_persisted(&self, agreement: &Agreement) -> Result<bool, DepositError> {
        let records = self.ledger.records::<Agreement>();
        Ok(records.get(&agreement.id.to_string())?.is_some()
            || records.by_unique("number", &agreement.number)?.is_some())
    }
}
