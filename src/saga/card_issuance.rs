use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::is_duplicate_insert;
use crate::domain::Card;
use crate::error::DepositError;
use crate::events::{CardMaterialized, ChannelNames, NewCardRequested};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

/// Card issuance. The bank decides which account gets the card.
pub struct CardIssuanceSaga<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
    channels: ChannelNames,
}

impl<S: LedgerStore> CardIssuanceSaga<S> {
    pub fn new(ledger: Arc<Ledger<S>>, channels: ChannelNames) -> Self {
        Self { ledger, channels }
    }

    /// Check the card product exists, then emit the request.
    pub fn request_card(&self, request: NewCardRequested) -> Result<String, DepositError> {
        self.ledger.card_product(request.product_id)?;

        let message_id = self.ledger.transaction(|tx| {
            tx.enqueue_correlated(&self.channels, &request, request.client_id.to_string())
        })?;

        info!(
            client_id = %request.client_id,
            product_id = request.product_id,
            message_id = %message_id,
            "card request accepted"
        );
        Ok(message_id)
    }

    /// Attach the materialized card to its account. The first card of an
    /// account becomes its default card. A redelivered card is skipped.
    pub fn on_card_materialized(&self, event: CardMaterialized) -> Result<(), DepositError> {
        if self.ledger.card_by_number(&event.card_number).is_ok() {
            warn!(card_number = %event.card_number, "card already persisted, skipping");
            return Ok(());
        }
        let account_id = self.ledger.account_by_number(&event.account_number)?.id;
        let card_number = event.card_number.clone();

        let result = self.ledger.transaction(|tx| {
            tx.account_for_update(account_id)?;
            let is_default = tx.ledger().cards_of(account_id)?.is_empty();

            let card = Card {
                id: Uuid::new_v4(),
                account_id,
                card_product_id: event.card_product_id,
                card_number: event.card_number,
                balance: event.balance,
                transaction_limit: event.transaction_limit,
                status: event.status,
                expiration_date: event.expiration_date,
                holder_name: event.holder_name,
                digital_wallet: event.digital_wallet,
                is_default,
            };
            let id = card.id;
            tx.insert_card(card)?;
            Ok((id, is_default))
        });

        match result {
            Ok((card_id, is_default)) => {
                info!(
                    card_id = %card_id,
                    card_number = %card_number,
                    account_number = %event.account_number,
                    is_default,
                    "card issued"
                );
                Ok(())
            }
            Err(err) if is_duplicate_insert(&err) => {
                warn!(card_number = %card_number, "card already persisted, skipping");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
