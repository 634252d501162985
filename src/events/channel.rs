use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;

use crate::config::ConfigError;

/// Logical role of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// deposit service -> ABS: new deposit request
    NewDeposit,
    /// ABS -> deposit service: materialized agreement
    DepositCreated,
    /// deposit service -> ABS: new card request
    NewCard,
    /// ABS -> deposit service: materialized card
    CardCreated,
    /// deposit service -> ABS: client changed a card status
    CardStatusOutbound,
    /// ABS -> deposit service: card status changed by the bank
    CardStatusInbound,
    /// deposit service -> ABS: early withdrawal request
    WithdrawalRequest,
    /// ABS -> deposit service: withdrawal settlement
    WithdrawalSettled,
    /// deposit service -> ABS: auto-renewal flag changed
    AutoRenewal,
    /// deposit service -> ABS: client asked for a new card PIN
    NewPinCode,
}

impl Channel {
    pub const ALL: [Channel; 10] = [
        Channel::NewDeposit,
        Channel::DepositCreated,
        Channel::NewCard,
        Channel::CardCreated,
        Channel::CardStatusOutbound,
        Channel::CardStatusInbound,
        Channel::WithdrawalRequest,
        Channel::WithdrawalSettled,
        Channel::AutoRenewal,
        Channel::NewPinCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::NewDeposit => "new-deposit",
            Channel::DepositCreated => "deposit-created",
            Channel::NewCard => "new-card",
            Channel::CardCreated => "card-created",
            Channel::CardStatusOutbound => "card-status-outbound",
            Channel::CardStatusInbound => "card-status-inbound",
            Channel::WithdrawalRequest => "withdrawal-request",
            Channel::WithdrawalSettled => "withdrawal-settled",
            Channel::AutoRenewal => "auto-renewal",
            Channel::NewPinCode => "new-pin-code",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete channel (topic) name per role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ChannelNames {
    pub new_deposit: String,
    pub deposit_created: String,
    pub new_card: String,
    pub card_created: String,
    pub card_status_outbound: String,
    pub card_status_inbound: String,
    pub withdrawal_request: String,
    pub withdrawal_settled: String,
    pub auto_renewal: String,
    pub new_pin_code: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            new_deposit: "deposit-service.new-deposit".into(),
            deposit_created: "bank-system.new-deposit".into(),
            new_card: "deposit-service.new-card".into(),
            card_created: "bank-system.new-card".into(),
            card_status_outbound: "deposit-service.card-status".into(),
            card_status_inbound: "bank-system.card-status".into(),
            withdrawal_request: "deposit-service.withdraw-deposit".into(),
            withdrawal_settled: "bank-system.withdraw-deposit".into(),
            auto_renewal: "deposit-service.auto-renewal".into(),
            new_pin_code: "deposit-service.new-pin-code".into(),
        }
    }
}

impl ChannelNames {
    pub fn name(&self, channel: Channel) -> &str {
        match channel {
            Channel::NewDeposit => &self.new_deposit,
            Channel::DepositCreated => &self.deposit_created,
            Channel::NewCard => &self.new_card,
            Channel::CardCreated => &self.card_created,
            Channel::CardStatusOutbound => &self.card_status_outbound,
            Channel::CardStatusInbound => &self.card_status_inbound,
            Channel::WithdrawalRequest => &self.withdrawal_request,
            Channel::WithdrawalSettled => &self.withdrawal_settled,
            Channel::AutoRenewal => &self.auto_renewal,
            Channel::NewPinCode => &self.new_pin_code,
        }
    }

    pub fn set(&mut self, channel: Channel, name: impl Into<String>) {
        let slot = match channel {
            Channel::NewDeposit => &mut self.new_deposit,
            Channel::DepositCreated => &mut self.deposit_created,
            Channel::NewCard => &mut self.new_card,
            Channel::CardCreated => &mut self.card_created,
            Channel::CardStatusOutbound => &mut self.card_status_outbound,
            Channel::CardStatusInbound => &mut self.card_status_inbound,
            Channel::WithdrawalRequest => &mut self.withdrawal_request,
            Channel::WithdrawalSettled => &mut self.withdrawal_settled,
            Channel::AutoRenewal => &mut self.auto_renewal,
            Channel::NewPinCode => &mut self.new_pin_code,
        };
        *slot = name.into();
    }

    /// Every role needs its own non-empty channel name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for channel in Channel::ALL {
            let name = self.name(channel);
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("channel {} has an empty name", channel)));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "channel name {} is used by more than one role",
                    name
                )));
            }
        }
        Ok(())
    }
}
