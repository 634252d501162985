use std::sync::Arc;

use crate::domain::{CardProduct, Product};
use crate::error::DepositError;
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore};

/// Read-only product catalogs.
pub struct Catalog<S = InMemoryLedgerStore> {
    ledger: Arc<Ledger<S>>,
}

impl<S: LedgerStore> Catalog<S> {
    pub fn new(ledger: Arc<Ledger<S>>) -> Self {
        Self { ledger }
    }

    pub fn active_products(&self) -> Result<Vec<Product>, DepositError> {
        let mut products = self.ledger.products()?;
        products.retain(|p| p.is_active);
        Ok(products)
    }

    pub fn product(&self, id: u32) -> Result<Product, DepositError> {
        self.ledger.product(id)
    }

    pub fn active_card_products(&self) -> Result<Vec<CardProduct>, DepositError> {
        let mut products = self.ledger.card_products()?;
        products.retain(|p| p.is_active);
        Ok(products)
    }

    pub fn card_product(&self, id: u32) -> Result<CardProduct, DepositError> {
        self.ledger.card_product(id)
    }
}
