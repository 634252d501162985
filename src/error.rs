//! Error taxonomy shared by the sagas, the ledger facade and the services.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::bus::PublishError;
use crate::config::ConfigError;
use crate::domain::CardStatus;
use crate::ledger::StoreError;
use crate::lock::LockError;

#[derive(Debug, Error)]
pub enum DepositError {
    /// A referenced account, card, agreement or catalog entry is absent.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A card status transition that would not change the status.
    #[error("card {card_id} already has status {status}")]
    DuplicateStatus { card_id: Uuid, status: CardStatus },

    #[error("card {card_number} expired on {expired_on}")]
    CardExpired {
        card_number: String,
        expired_on: NaiveDate,
    },

    #[error("insufficient funds on card {card_number}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        card_number: String,
        balance: Decimal,
        requested: Decimal,
    },

    /// A business rule refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// No handler is registered for an incoming event type.
    #[error("unknown event type: {0}")]
    UnknownEvent(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DepositError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        DepositError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            DepositError::NotFound { .. } => 404,
            DepositError::Store(StoreError::NotFound { .. }) => 404,
            DepositError::DuplicateStatus { .. } => 400,
            DepositError::CardExpired { .. } => 400,
            DepositError::Decode(_) => 400,
            DepositError::Rejected(_) => 422,
            DepositError::Store(StoreError::Conflict { .. }) => 409,
            DepositError::UnknownEvent(_) => 404,
            DepositError::InsufficientFunds { .. }
            | DepositError::Store(_)
            | DepositError::Lock(_)
            | DepositError::Publish(_)
            | DepositError::Config(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
