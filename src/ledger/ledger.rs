use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::{InMemoryLedgerStore, LedgerStore, LedgerTx, Record, Records, Versioned};
use crate::domain::{
    Account, Agreement, Card, CardProduct, Operation, Product, Withdrawal, WithdrawalStatus,
};
use crate::error::DepositError;
use crate::lock::{InMemoryLockManager, LockError, LockManager, RowGuard};
use crate::outbox::OutboxMessage;

/// Domain-level access to the Ledger Store.
///
/// Reads go straight to the store. Every mutation runs inside
/// [`Ledger::transaction`], which serializes access to the touched rows
/// and commits all staged writes (including outbox messages) atomically.
pub struct Ledger<S = InMemoryLedgerStore> {
    store: S,
    locks: Arc<dyn LockManager>,
    lock_timeout: Duration,
    outbox_sequence: AtomicU64,
}

impl Ledger<InMemoryLedgerStore> {
    /// An empty in-memory ledger.
    pub fn in_memory() -> Self {
        Self::new(InMemoryLedgerStore::new(), Arc::new(InMemoryLockManager::new()))
    }
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S, locks: Arc<dyn LockManager>) -> Self {
        let last_sequence = store
            .find_records::<OutboxMessage>(&|_| true)
            .map(|messages| messages.iter().map(|m| m.data.sequence).max().unwrap_or(0))
            .unwrap_or(0);

        Self {
            store,
            locks,
            lock_timeout: Duration::from_secs(5),
            outbox_sequence: AtomicU64::new(last_sequence),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn records<R: Record>(&self) -> Records<'_, S, R> {
        Records::new(&self.store)
    }

    /// Run `work` as one unit: its staged writes commit together when it
    /// returns `Ok`, and nothing is written when it returns `Err`.
    pub fn transaction<T, F>(&self, work: F) -> Result<T, DepositError>
    where
        F: FnOnce(&mut LedgerTx<'_, S>) -> Result<T, DepositError>,
    {
        let mut tx = LedgerTx::new(self);
        let value = work(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub(super) fn lock_row(&self, key: &str) -> Result<RowGuard, LockError> {
        RowGuard::acquire(self.locks.as_ref(), key, self.lock_timeout)
    }

    pub(crate) fn next_outbox_sequence(&self) -> u64 {
        self.outbox_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn require<R: Record>(&self, entity: &'static str, id: &str) -> Result<Versioned<R>, DepositError> {
        self.store
            .get_record::<R>(id)?
            .ok_or_else(|| DepositError::not_found(entity, id))
    }

    // ---- accounts ----

    pub fn account(&self, id: Uuid) -> Result<Account, DepositError> {
        Ok(self.require::<Account>("account", &id.to_string())?.data)
    }

    pub fn account_by_number(&self, account_number: &str) -> Result<Account, DepositError> {
        self.store
            .get_by_unique::<Account>("account_number", account_number)?
            .map(|v| v.data)
            .ok_or_else(|| DepositError::not_found("account", account_number))
    }

    /// All accounts of a client, active or not, ordered by account number.
    pub fn client_accounts(&self, client_id: Uuid) -> Result<Vec<Account>, DepositError> {
        let mut accounts = self.records::<Account>().find(|a| a.client_id == client_id)?;
        accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));
        Ok(accounts)
    }

    /// Open a new account. Its balance starts at zero.
    pub fn open_account(&self, account: Account) -> Result<Account, DepositError> {
        let id = account.id;
        self.transaction(|tx| tx.insert_account(account))?;
        self.account(id)
    }

    // ---- cards ----

    pub fn card(&self, id: Uuid) -> Result<Card, DepositError> {
        Ok(self.require::<Card>("card", &id.to_string())?.data)
    }

    pub fn card_by_number(&self, card_number: &str) -> Result<Card, DepositError> {
        self.store
            .get_by_unique::<Card>("card_number", card_number)?
            .map(|v| v.data)
            .ok_or_else(|| DepositError::not_found("card", card_number))
    }

    /// A card by number, only if it belongs to one of the client's accounts.
    pub fn client_card_by_number(
        &self,
        client_id: Uuid,
        card_number: &str,
    ) -> Result<Card, DepositError> {
        let card = self.card_by_number(card_number)?;
        self.ensure_owner(client_id, &card)?;
        Ok(card)
    }

    /// A card by id, only if it belongs to one of the client's accounts.
    pub fn client_card(&self, client_id: Uuid, card_id: Uuid) -> Result<Card, DepositError> {
        let card = self.card(card_id)?;
        self.ensure_owner(client_id, &card)?;
        Ok(card)
    }

    fn ensure_owner(&self, client_id: Uuid, card: &Card) -> Result<(), DepositError> {
        match self.account(card.account_id) {
            Ok(account) if account.client_id == client_id => Ok(()),
            Ok(_) | Err(DepositError::NotFound { .. }) => {
                Err(DepositError::not_found("card", &card.card_number))
            }
            Err(err) => Err(err),
        }
    }

    /// Cards of an account ordered by card number.
    pub fn cards_of(&self, account_id: Uuid) -> Result<Vec<Card>, DepositError> {
        let mut cards = self.records::<Card>().find(|c| c.account_id == account_id)?;
        cards.sort_by(|a, b| a.card_number.cmp(&b.card_number));
        Ok(cards)
    }

    /// Attach an already materialized card to its account.
    pub fn add_card(&self, card: Card) -> Result<Card, DepositError> {
        let id = card.id;
        self.transaction(|tx| tx.insert_card(card))?;
        self.card(id)
    }

    // ---- agreements ----

    pub fn agreement(&self, id: Uuid) -> Result<Agreement, DepositError> {
        Ok(self.require::<Agreement>("agreement", &id.to_string())?.data)
    }

    /// Agreements of all the client's accounts, ordered by start date.
    pub fn client_agreements(&self, client_id: Uuid) -> Result<Vec<Agreement>, DepositError> {
        let account_ids: Vec<Uuid> = self
            .client_accounts(client_id)?
            .into_iter()
            .map(|a| a.id)
            .collect();
        let mut agreements = self
            .records::<Agreement>()
            .find(|a| account_ids.contains(&a.account_id))?;
        agreements.sort_by_key(|a| a.start_date);
        Ok(agreements)
    }

    pub fn client_agreement(
        &self,
        client_id: Uuid,
        agreement_id: Uuid,
    ) -> Result<Agreement, DepositError> {
        let agreement = self.agreement(agreement_id)?;
        match self.account(agreement.account_id) {
            Ok(account) if account.client_id == client_id => Ok(agreement),
            Ok(_) | Err(DepositError::NotFound { .. }) => {
                Err(DepositError::not_found("agreement", agreement_id))
            }
            Err(err) => Err(err),
        }
    }

    // ---- catalogs ----

    pub fn product(&self, id: u32) -> Result<Product, DepositError> {
        Ok(self.require::<Product>("product", &id.to_string())?.data)
    }

    pub fn products(&self) -> Result<Vec<Product>, DepositError> {
        let mut products = self.records::<Product>().all()?;
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    pub fn add_product(&self, product: &Product) -> Result<(), DepositError> {
        self.records::<Product>().insert(product)?;
        Ok(())
    }

    pub fn card_product(&self, id: u32) -> Result<CardProduct, DepositError> {
        Ok(self.require::<CardProduct>("card product", &id.to_string())?.data)
    }

    pub fn card_products(&self) -> Result<Vec<CardProduct>, DepositError> {
        let mut products = self.records::<CardProduct>().all()?;
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    pub fn add_card_product(&self, product: &CardProduct) -> Result<(), DepositError> {
        self.records::<CardProduct>().insert(product)?;
        Ok(())
    }

    // ---- operations and withdrawals ----

    /// Operations of an account in completion order.
    pub fn operations_of(&self, account_id: Uuid) -> Result<Vec<Operation>, DepositError> {
        let mut operations = self
            .records::<Operation>()
            .find(|o| o.account_id == account_id)?;
        operations.sort_by_key(|o| o.completed_at);
        Ok(operations)
    }

    pub fn withdrawal(&self, agreement_id: Uuid) -> Result<Option<Withdrawal>, DepositError> {
        Ok(self
            .records::<Withdrawal>()
            .get(&agreement_id.to_string())?
            .map(|v| v.data))
    }

    pub fn withdrawals_in(&self, status: WithdrawalStatus) -> Result<Vec<Withdrawal>, DepositError> {
        let mut withdrawals = self.records::<Withdrawal>().find(|w| w.status == status)?;
        withdrawals.sort_by_key(|w| w.requested_at);
        Ok(withdrawals)
    }
}
