use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::Agreement;
use crate::error::DepositError;
use crate::events::{AutoRenewalToggled, ChannelNames};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

/// Auto-renewal of an active agreement. The local write is authoritative;
/// the bank is only notified.
pub struct AutoRenewalToggle<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
    channels: ChannelNames,
}

impl<S: LedgerStore> AutoRenewalToggle<S> {
    pub fn new(ledger: Arc<Ledger<S>>, channels: ChannelNames) -> Self {
        Self { ledger, channels }
    }

    pub fn toggle(
        &self,
        client_id: Uuid,
        agreement_id: Uuid,
        auto_renewal: bool,
    ) -> Result<Agreement, DepositError> {
        let agreement = self.ledger.client_agreement(client_id, agreement_id)?;
        if !agreement.is_active {
            return Err(DepositError::not_found("active agreement", agreement_id));
        }

        let updated = self.ledger.transaction(|tx| {
            let mut agreement = tx.agreement_for_update(agreement_id)?;
            if !agreement.data.is_active {
                return Err(DepositError::not_found("active agreement", agreement_id));
            }
            agreement.data.auto_renewal = auto_renewal;
            let updated = agreement.data.clone();
            tx.put_agreement(agreement)?;
            tx.enqueue(
                &self.channels,
                &AutoRenewalToggled {
                    agreement_id,
                    auto_renewal,
                },
            )?;
            Ok(updated)
        })?;

        info!(agreement_id = %agreement_id, auto_renewal, "auto-renewal toggled");
        Ok(updated)
    }
}
