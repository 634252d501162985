use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::Gateway;
use crate::bus::{Event, Listener, PublishError, Sender};
use crate::consumer::{EventRouter, PumpStats};
use crate::domain::CardStatus;
use crate::error::DepositError;
use crate::events::{
    AutoRenewalToggled, CardStatusChanged, CardStatusCommand, ChannelEvent, ChannelNames,
    DepositMaterialized, NewCardRequested, NewDepositRequested, PinCodeChangeRequested,
    WithdrawalRequested,
};

/// Connects a [`Gateway`] to the bus.
///
/// Consumes the request channels, calls the gateway, and publishes each
/// reply on its reply channel. Notifications (card status, auto-renewal,
/// PIN changes) are handed to the gateway without a reply.
pub struct GatewayBridge<T> {
    router: Arc<EventRouter>,
    sender: T,
    channels: ChannelNames,
}

impl<T> GatewayBridge<T>
where
    T: Sender + Clone + Send + Sync + 'static,
{
    pub fn new<G>(gateway: Arc<G>, sender: T, channels: ChannelNames) -> Self
    where
        G: Gateway + ?Sized + 'static,
    {
        let router = EventRouter::new(channels.clone())
            .on({
                let (gateway, sender, channels) = (gateway.clone(), sender.clone(), channels.clone());
                move |request: NewDepositRequested| {
                    let agreement = gateway.submit_deposit_request(&request)?;
                    reply(&sender, &channels, &DepositMaterialized(agreement))
                }
            })
            .on({
                let (gateway, sender, channels) = (gateway.clone(), sender.clone(), channels.clone());
                move |request: NewCardRequested| {
                    let card = gateway.submit_card_request(&request)?;
                    reply(&sender, &channels, &card)
                }
            })
            .on({
                let (gateway, sender, channels) = (gateway.clone(), sender.clone(), channels.clone());
                move |request: WithdrawalRequested| {
                    let settlement = gateway.submit_withdrawal_request(&request)?;
                    reply(&sender, &channels, &settlement)
                }
            })
            .on({
                let gateway = gateway.clone();
                move |change: CardStatusChanged| gateway.notify_card_status(&change)
            })
            .on({
                let gateway = gateway.clone();
                move |toggle: AutoRenewalToggled| gateway.notify_auto_renewal(&toggle)
            })
            .on(move |request: PinCodeChangeRequested| gateway.notify_pin_code_change(&request));

        Self {
            router: Arc::new(router),
            sender,
            channels,
        }
    }

    /// Serve every request currently waiting.
    pub fn pump<L: Listener + ?Sized>(&self, listener: &L) -> Result<PumpStats, PublishError> {
        self.router.pump(listener)
    }

    /// Push a bank-initiated card status change to the deposit service.
    pub fn push_card_status(&self, card_id: Uuid, new_status: CardStatus) -> Result<(), DepositError> {
        reply(
            &self.sender,
            &self.channels,
            &CardStatusCommand { card_id, new_status },
        )
    }

    /// The request router, for a background listener.
    pub fn router(&self) -> Arc<EventRouter> {
        self.router.clone()
    }
}

fn reply<T: Sender + ?Sized, E: ChannelEvent>(
    sender: &T,
    channels: &ChannelNames,
    payload: &E,
) -> Result<(), DepositError> {
    let channel = channels.name(E::CHANNEL);
    let event = Event::encode(Uuid::new_v4().to_string(), E::EVENT_TYPE, payload)?;
    sender.send(channel, event)?;
    debug!(channel, event_type = E::EVENT_TYPE, "gateway reply sent");
    Ok(())
}
