use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Channel, ChannelEvent};
use crate::domain::{CardStatus, DigitalWallet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCardRequested {
    pub client_id: Uuid,
    pub product_id: u32,
}

impl ChannelEvent for NewCardRequested {
    const CHANNEL: Channel = Channel::NewCard;
    const EVENT_TYPE: &'static str = "NewCardRequested";
}

/// Card attributes chosen by the core-banking system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMaterialized {
    pub account_number: String,
    pub card_number: String,
    pub transaction_limit: Decimal,
    pub status: CardStatus,
    pub expiration_date: NaiveDate,
    pub holder_name: String,
    pub digital_wallet: DigitalWallet,
    pub card_product_id: u32,
    pub balance: Decimal,
}

impl ChannelEvent for CardMaterialized {
    const CHANNEL: Channel = Channel::CardCreated;
    const EVENT_TYPE: &'static str = "CardMaterialized";
}

/// A client changed the status of one of their cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatusChanged {
    pub card_id: Uuid,
    pub new_status: CardStatus,
}

impl ChannelEvent for CardStatusChanged {
    const CHANNEL: Channel = Channel::CardStatusOutbound;
    const EVENT_TYPE: &'static str = "CardStatusChanged";
}

/// The bank changed the status of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatusCommand {
    pub card_id: Uuid,
    pub new_status: CardStatus,
}

impl ChannelEvent for CardStatusCommand {
    const CHANNEL: Channel = Channel::CardStatusInbound;
    const EVENT_TYPE: &'static str = "CardStatusCommand";
}

/// A client asked for a new PIN on one of their cards. The PIN itself is
/// set by the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinCodeChangeRequested {
    pub card_number: String,
    pub new_pin: String,
}

impl ChannelEvent for PinCodeChangeRequested {
    const CHANNEL: Channel = Channel::NewPinCode;
    const EVENT_TYPE: &'static str = "PinCodeChangeRequested";
}
