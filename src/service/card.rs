use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Card, CardStatus};
use crate::error::DepositError;
use crate::events::{ChannelNames, PinCodeChangeRequested};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

pub struct CardService<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
    channels: ChannelNames,
}

impl<S: LedgerStore> CardService<S> {
    pub fn new(ledger: Arc<Ledger<S>>, channels: ChannelNames) -> Self {
        Self { ledger, channels }
    }

    /// A card of the client. Closed cards are treated as absent.
    pub fn card_info(&self, client_id: Uuid, card_id: Uuid) -> Result<Card, DepositError> {
        let card = self.ledger.client_card(client_id, card_id)?;
        if card.status == CardStatus::Closed {
            return Err(DepositError::not_found("card", card_id));
        }
        Ok(card)
    }

    /// All cards on the client's accounts, closed ones included.
    pub fn client_cards(&self, client_id: Uuid) -> Result<Vec<Card>, DepositError> {
        let mut cards = Vec::new();
        for account in self.ledger.client_accounts(client_id)? {
            cards.extend(self.ledger.cards_of(account.id)?);
        }
        Ok(cards)
    }

    pub fn change_limit(
        &self,
        client_id: Uuid,
        card_number: &str,
        limit: Decimal,
    ) -> Result<Card, DepositError> {
        if limit.is_sign_negative() {
            return Err(DepositError::Rejected(format!(
                "transaction limit must not be negative, got {limit}"
            )));
        }
        let card_id = self.ledger.client_card_by_number(client_id, card_number)?.id;

        let card = self.ledger.transaction(|tx| {
            let mut card = tx.card_for_update(card_id)?;
            card.data.transaction_limit = limit;
            let updated = card.data.clone();
            tx.put_card(card);
            Ok(updated)
        })?;

        info!(card_number = %card_number, limit = %limit, "card limit changed");
        Ok(card)
    }

    /// Number of any card, whoever owns it.
    pub fn card_number(&self, card_id: Uuid) -> Result<String, DepositError> {
        Ok(self.ledger.card(card_id)?.card_number)
    }

    /// Ask the bank to set a new PIN on a card of the client.
    pub fn change_pin_code(
        &self,
        client_id: Uuid,
        card_number: &str,
        new_pin: &str,
    ) -> Result<(), DepositError> {
        if new_pin.is_empty() || !new_pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(DepositError::Rejected("PIN must be a non-empty string of digits".into()));
        }
        let card = self.ledger.client_card_by_number(client_id, card_number)?;
        if card.status == CardStatus::Closed {
            return Err(DepositError::not_found("card", card_number));
        }

        let request = PinCodeChangeRequested {
            card_number: card.card_number,
            new_pin: new_pin.to_string(),
        };
        self.ledger
            .transaction(|tx| tx.enqueue_correlated(&self.channels, &request, card.id.to_string()))?;

        info!(card_id = %card.id, "PIN change requested");
        Ok(())
    }

    /// Remove a card of the client. Its account balance is recomputed
    /// without it. Deleting the default card makes another card of the
    /// account the default, preferring an active one.
    pub fn delete_card(&self, client_id: Uuid, card_id: Uuid) -> Result<(), DepositError> {
        self.ledger.client_card(client_id, card_id)?;

        let promoted = self.ledger.transaction(|tx| {
            let card = tx.card_for_update(card_id)?;
            let next_default = if card.data.is_default {
                successor(tx.ledger().cards_of(card.data.account_id)?, card_id)
            } else {
                None
            };
            tx.delete_card(card);

            if let Some(next) = next_default {
                let mut next = tx.card_for_update(next)?;
                next.data.is_default = true;
                tx.put_card(next);
            }
            Ok(next_default)
        })?;

        info!(card_id = %card_id, promoted = ?promoted, "card deleted");
        Ok(())
    }

    /// Debit `sum` from a card.
    pub fn write_off(&self, card_number: &str, sum: Decimal) -> Result<Card, DepositError> {
        if sum <= Decimal::ZERO {
            return Err(DepositError::Rejected(format!(
                "write-off sum must be positive, got {sum}"
            )));
        }

        let card = self.ledger.transaction(|tx| {
            let mut card = tx.card_by_number_for_update(card_number)?;
            if card.data.balance < sum {
                return Err(DepositError::InsufficientFunds {
                    card_number: card.data.card_number,
                    balance: card.data.balance,
                    requested: sum,
                });
            }
            card.data.balance -= sum;
            let updated = card.data.clone();
            tx.put_card(card);
            Ok(updated)
        })?;

        info!(card_number = %card_number, sum = %sum, balance = %card.balance, "card written off");
        Ok(card)
    }
}

/// Card to become the default once `deleted` is gone.
fn successor(cards: Vec<Card>, deleted: Uuid) -> Option<Uuid> {
    let mut remaining: Vec<Card> = cards
        .into_iter()
        .filter(|c| c.id != deleted && c.status != CardStatus::Closed)
        .collect();
    remaining.sort_by_key(|c| (c.status != CardStatus::Active, c.card_number.clone()));
    remaining.first().map(|c| c.id)
}
