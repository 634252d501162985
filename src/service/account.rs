use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Account, Card, CardStatus, CurrencyCode, PaymentSystem};
use crate::error::DepositError;
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountWithCards {
    pub account: Account,
    pub cards: Vec<Card>,
}

/// One card with its account and product, as shown to its holder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub card_id: Uuid,
    pub holder_name: String,
    pub status: CardStatus,
    pub card_number: String,
    pub expiration_date: NaiveDate,
    pub card_name: String,
    pub payment_system: PaymentSystem,
    pub currency_code: CurrencyCode,
    pub card_balance: Decimal,
    pub account_id: Uuid,
    pub account_number: String,
}

pub struct AccountService<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
}

impl<S: LedgerStore> AccountService<S> {
    pub fn new(ledger: Arc<Ledger<S>>) -> Self {
        Self { ledger }
    }

    pub fn active_accounts(&self, client_id: Uuid) -> Result<Vec<Account>, DepositError> {
        let mut accounts = self.ledger.client_accounts(client_id)?;
        accounts.retain(|a| a.is_active);
        Ok(accounts)
    }

    pub fn accounts_with_cards(&self, client_id: Uuid) -> Result<Vec<AccountWithCards>, DepositError> {
        self.ledger
            .client_accounts(client_id)?
            .into_iter()
            .map(|account| {
                let cards = self.ledger.cards_of(account.id)?;
                Ok(AccountWithCards { account, cards })
            })
            .collect()
    }

    /// A card of the client together with its account and product. Closed
    /// cards are included.
    pub fn view_card(&self, client_id: Uuid, card_id: Uuid) -> Result<CardView, DepositError> {
        let card = self.ledger.client_card(client_id, card_id)?;
        let account = self.ledger.account(card.account_id)?;
        let product = self.ledger.card_product(card.card_product_id)?;

        Ok(CardView {
            card_id: card.id,
            holder_name: card.holder_name,
            status: card.status,
            card_number: card.card_number,
            expiration_date: card.expiration_date,
            card_name: product.card_name,
            payment_system: product.payment_system,
            currency_code: account.currency_code,
            card_balance: card.balance,
            account_id: account.id,
            account_number: account.account_number,
        })
    }
}
