use std::collections::{BTreeMap, BTreeSet, HashSet};

use uuid::Uuid;

use super::{row_key, Ledger, LedgerStore, Record, Versioned, WriteBatch};
use crate::domain::{Account, Agreement, Card, Operation, Withdrawal};
use crate::error::DepositError;
use crate::events::{ChannelEvent, ChannelNames};
use crate::lock::RowGuard;
use crate::outbox::OutboxMessage;

enum CardWrite {
    Insert(Card),
    Update(Card, u64),
    Delete(Card, u64),
}

/// Staged writes of one ledger transaction.
///
/// Rows read "for update" are locked until the transaction ends. Acquire
/// them in this order: withdrawal, agreement, card, account. Account rows
/// touched through their cards are locked at commit, when their balances
/// are recomputed.
pub struct LedgerTx<'a, S> {
    ledger: &'a Ledger<S>,
    guards: Vec<RowGuard>,
    held: HashSet<String>,
    batch: WriteBatch,
    cards: BTreeMap<Uuid, CardWrite>,
    accounts: BTreeSet<Uuid>,
    new_accounts: BTreeMap<Uuid, Account>,
}

impl<'a, S: LedgerStore> LedgerTx<'a, S> {
    pub(super) fn new(ledger: &'a Ledger<S>) -> Self {
        Self {
            ledger,
            guards: Vec::new(),
            held: HashSet::new(),
            batch: WriteBatch::new(),
            cards: BTreeMap::new(),
            accounts: BTreeSet::new(),
            new_accounts: BTreeMap::new(),
        }
    }

    /// Read access to committed state.
    pub fn ledger(&self) -> &'a Ledger<S> {
        self.ledger
    }

    fn lock<R: Record>(&mut self, id: &str) -> Result<(), DepositError> {
        let key = row_key(R::COLLECTION, id);
        if self.held.contains(&key) {
            return Ok(());
        }
        let guard = self.ledger.lock_row(&key)?;
        self.guards.push(guard);
        self.held.insert(key);
        Ok(())
    }

    fn load<R: Record>(&mut self, entity: &'static str, id: &str) -> Result<Versioned<R>, DepositError> {
        self.lock::<R>(id)?;
        self.ledger
            .store()
            .get_record::<R>(id)?
            .ok_or_else(|| DepositError::not_found(entity, id))
    }

    // ---- cards ----

    pub fn card_for_update(&mut self, id: Uuid) -> Result<Versioned<Card>, DepositError> {
        self.load::<Card>("card", &id.to_string())
    }

    pub fn card_by_number_for_update(
        &mut self,
        card_number: &str,
    ) -> Result<Versioned<Card>, DepositError> {
        let id = self.ledger.card_by_number(card_number)?.id;
        let card = self.card_for_update(id)?;
        if card.data.card_number != card_number {
            return Err(DepositError::not_found("card", card_number));
        }
        Ok(card)
    }

    pub fn insert_card(&mut self, card: Card) -> Result<(), DepositError> {
        self.lock::<Card>(&card.id.to_string())?;
        self.accounts.insert(card.account_id);
        self.cards.insert(card.id, CardWrite::Insert(card));
        Ok(())
    }

    /// Stage an updated card read with [`card_for_update`](Self::card_for_update).
    pub fn put_card(&mut self, card: Versioned<Card>) {
        self.accounts.insert(card.data.account_id);
        let write = match self.cards.remove(&card.data.id) {
            Some(CardWrite::Insert(_)) => CardWrite::Insert(card.data),
            _ => CardWrite::Update(card.data, card.version),
        };
        self.cards.insert(card_id(&write), write);
    }

    pub fn delete_card(&mut self, card: Versioned<Card>) {
        self.accounts.insert(card.data.account_id);
        self.cards
            .insert(card.data.id, CardWrite::Delete(card.data, card.version));
    }

    // ---- accounts ----

    /// Lock an account ahead of commit. After this only rows no other
    /// transaction can hold (new cards, new operations) may be locked.
    pub fn account_for_update(&mut self, id: Uuid) -> Result<Versioned<Account>, DepositError> {
        self.load::<Account>("account", &id.to_string())
    }

    pub fn insert_account(&mut self, account: Account) -> Result<(), DepositError> {
        self.lock::<Account>(&account.id.to_string())?;
        self.accounts.insert(account.id);
        self.new_accounts.insert(account.id, account);
        Ok(())
    }

    // ---- agreements ----

    pub fn agreement_for_update(&mut self, id: Uuid) -> Result<Versioned<Agreement>, DepositError> {
        self.load::<Agreement>("agreement", &id.to_string())
    }

    pub fn insert_agreement(&mut self, agreement: &Agreement) -> Result<(), DepositError> {
        self.lock::<Agreement>(&agreement.id.to_string())?;
        self.batch.insert(agreement)?;
        Ok(())
    }

    pub fn put_agreement(&mut self, agreement: Versioned<Agreement>) -> Result<(), DepositError> {
        self.batch.update(&agreement.data, agreement.version)?;
        Ok(())
    }

    // ---- operations ----

    pub fn append_operation(&mut self, operation: &Operation) -> Result<(), DepositError> {
        self.batch.insert(operation)?;
        Ok(())
    }

    // ---- withdrawals ----

    pub fn withdrawal_for_update(
        &mut self,
        agreement_id: Uuid,
    ) -> Result<Option<Versioned<Withdrawal>>, DepositError> {
        let id = agreement_id.to_string();
        self.lock::<Withdrawal>(&id)?;
        Ok(self.ledger.store().get_record::<Withdrawal>(&id)?)
    }

    pub fn insert_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), DepositError> {
        self.lock::<Withdrawal>(&withdrawal.agreement_id.to_string())?;
        self.batch.insert(withdrawal)?;
        Ok(())
    }

    pub fn put_withdrawal(&mut self, withdrawal: Versioned<Withdrawal>) -> Result<(), DepositError> {
        self.batch.update(&withdrawal.data, withdrawal.version)?;
        Ok(())
    }

    // ---- outbox ----

    /// Stage `event` for its channel. Returns the outbox message id.
    pub fn enqueue<E: ChannelEvent>(
        &mut self,
        channels: &ChannelNames,
        event: &E,
    ) -> Result<String, DepositError> {
        let message = OutboxMessage::encode(self.ledger.next_outbox_sequence(), channels, event)?;
        self.stage_message(message)
    }

    /// Like [`enqueue`](Self::enqueue), tagging the message with a correlation id.
    pub fn enqueue_correlated<E: ChannelEvent>(
        &mut self,
        channels: &ChannelNames,
        event: &E,
        correlation_id: impl Into<String>,
    ) -> Result<String, DepositError> {
        let message = OutboxMessage::encode(self.ledger.next_outbox_sequence(), channels, event)?
            .with_correlation_id(correlation_id);
        self.stage_message(message)
    }

    fn stage_message(&mut self, message: OutboxMessage) -> Result<String, DepositError> {
        self.batch.insert(&message)?;
        Ok(message.id)
    }

    // ---- commit ----

    pub(super) fn commit(mut self) -> Result<(), DepositError> {
        let cards = std::mem::take(&mut self.cards);
        let accounts: Vec<Uuid> = self.accounts.iter().copied().collect();

        for account_id in accounts {
            self.lock::<Account>(&account_id.to_string())?;
            self.recompute_account(account_id, &cards)?;
        }

        for write in cards.into_values() {
            match write {
                CardWrite::Insert(card) => {
                    self.batch.insert(&card)?;
                }
                CardWrite::Update(card, version) => {
                    self.batch.update(&card, version)?;
                }
                CardWrite::Delete(card, version) => {
                    self.batch.delete::<Card>(&card.id.to_string(), version);
                }
            }
        }

        let batch = std::mem::take(&mut self.batch);
        self.ledger.store().commit(batch)?;
        Ok(())
    }

    /// Stage the account with its balance recomputed from the cards it
    /// will hold once this transaction commits.
    fn recompute_account(
        &mut self,
        account_id: Uuid,
        staged: &BTreeMap<Uuid, CardWrite>,
    ) -> Result<(), DepositError> {
        let ledger = self.ledger;
        let store = ledger.store();
        let (mut account, version) = match self.new_accounts.remove(&account_id) {
            Some(account) => (account, None),
            None => {
                let current = store
                    .get_record::<Account>(&account_id.to_string())?
                    .ok_or_else(|| DepositError::not_found("account", account_id))?;
                (current.data, Some(current.version))
            }
        };

        let mut cards: BTreeMap<Uuid, Card> = store
            .find_records::<Card>(&|c| c.account_id == account_id)?
            .into_iter()
            .map(|v| (v.data.id, v.data))
            .collect();
        for (id, write) in staged {
            match write {
                CardWrite::Insert(card) | CardWrite::Update(card, _) if card.account_id == account_id => {
                    cards.insert(*id, card.clone());
                }
                _ => {
                    cards.remove(id);
                }
            }
        }

        let defaults = cards.values().filter(|c| c.is_default).count();
        if defaults > 1 {
            return Err(DepositError::Rejected(format!(
                "account {} cannot hold {} default cards",
                account.account_number, defaults
            )));
        }

        account.recompute_balance(cards.values());
        match version {
            Some(version) => self.batch.update(&account, version)?,
            None => self.batch.insert(&account)?,
        };
        Ok(())
    }
}

fn card_id(write: &CardWrite) -> Uuid {
    match write {
        CardWrite::Insert(card) | CardWrite::Update(card, _) | CardWrite::Delete(card, _) => card.id,
    }
}
