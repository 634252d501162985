use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Card, CardStatus};
use crate::error::DepositError;
use crate::events::{CardStatusChanged, CardStatusCommand, ChannelNames};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

/// Whether a status change is reported to the core-banking system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// Client-initiated: emit [`CardStatusChanged`].
    Emit,
    /// Bank-initiated: the bank already knows.
    Silent,
}

/// Any status may change to any other status; a change to the current
/// status is refused.
pub fn check_transition(card: &Card, new_status: CardStatus) -> Result<(), DepositError> {
    if card.status == new_status {
        return Err(DepositError::DuplicateStatus {
            card_id: card.id,
            status: new_status,
        });
    }
    Ok(())
}

/// Card status transitions, from both the client and the bank.
pub struct CardStatusMachine<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
    channels: ChannelNames,
}

impl<S: LedgerStore> CardStatusMachine<S> {
    pub fn new(ledger: Arc<Ledger<S>>, channels: ChannelNames) -> Self {
        Self { ledger, channels }
    }

    /// Client-initiated change of one of the client's cards.
    pub fn change_status(
        &self,
        client_id: Uuid,
        card_number: &str,
        new_status: CardStatus,
    ) -> Result<Card, DepositError> {
        let card = self.ledger.client_card_by_number(client_id, card_number)?;
        self.transition(card.id, new_status, Notify::Emit)
    }

    /// System-initiated change. Does not notify the bank.
    pub fn modify_status(&self, card_id: Uuid, new_status: CardStatus) -> Result<Card, DepositError> {
        self.transition(card_id, new_status, Notify::Silent)
    }

    pub fn on_status_command(&self, command: CardStatusCommand) -> Result<(), DepositError> {
        self.modify_status(command.card_id, command.new_status)
            .map(|_| ())
    }

    pub fn transition(
        &self,
        card_id: Uuid,
        new_status: CardStatus,
        notify: Notify,
    ) -> Result<Card, DepositError> {
        let result = self.ledger.transaction(|tx| {
            let mut card = tx.card_for_update(card_id)?;
            check_transition(&card.data, new_status)?;

            let old_status = card.data.status;
            card.data.status = new_status;
            let updated = card.data.clone();
            tx.put_card(card);

            if notify == Notify::Emit {
                tx.enqueue(&self.channels, &CardStatusChanged { card_id, new_status })?;
            }
            Ok((old_status, updated))
        });

        match result {
            Ok((old_status, card)) => {
                info!(
                    card_id = %card_id,
                    from = %old_status,
                    to = %new_status,
                    notify = ?notify,
                    "card status changed"
                );
                Ok(card)
            }
            Err(err @ DepositError::DuplicateStatus { .. }) => {
                warn!(card_id = %card_id, status = %new_status, "card already has status");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
