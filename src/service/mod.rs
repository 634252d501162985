//! Client operations outside the sagas, and the read side.
//!
//! Each operation is scoped to the calling client where it touches
//! client data: an entity of another client is reported as not found.

mod account;
mod card;
mod catalog;
mod deposit;

pub use account::{AccountService, AccountWithCards, CardView};
pub use card::CardService;
pub use catalog::Catalog;
pub use deposit::DepositService;
