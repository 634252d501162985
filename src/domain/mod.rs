//! Ledger entities.
//!
//! Accounts own cards, agreements and operations by id reference; the
//! Ledger Store keeps each entity in its own collection.

mod account;
mod agreement;
mod card;
mod operation;
mod product;
mod withdrawal;

pub use account::Account;
pub use agreement::Agreement;
pub use card::{Card, CardStatus, DigitalWallet};
pub use operation::{Operation, OperationType};
pub use product::{CardProduct, CurrencyCode, PaymentSystem, Product};
pub use withdrawal::{Withdrawal, WithdrawalStatus};
