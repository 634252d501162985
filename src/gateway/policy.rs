use rand::{Rng, RngCore};

use crate::domain::Account;

/// Picks the account a newly issued card is attached to.
pub trait AccountSelector: Send + Sync {
    fn select<'a>(&self, accounts: &'a [Account], rng: &mut dyn RngCore) -> Option<&'a Account>;
}

/// Any active account, uniformly at random.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomActiveAccount;

impl AccountSelector for RandomActiveAccount {
    fn select<'a>(&self, accounts: &'a [Account], rng: &mut dyn RngCore) -> Option<&'a Account> {
        let active: Vec<&Account> = accounts.iter().filter(|a| a.is_active).collect();
        if active.is_empty() {
            return None;
        }
        Some(active[rng.gen_range(0..active.len())])
    }
}

/// The active account with the lowest account number.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstActiveAccount;

impl AccountSelector for FirstActiveAccount {
    fn select<'a>(&self, accounts: &'a [Account], _rng: &mut dyn RngCore) -> Option<&'a Account> {
        accounts
            .iter()
            .filter(|a| a.is_active)
            .min_by(|a, b| a.account_number.cmp(&b.account_number))
    }
}
