use std::collections::HashMap;

use tracing::{debug, error, warn};

use crate::bus::{Event, Listener, PublishError};
use crate::error::DepositError;
use crate::events::{ChannelEvent, ChannelNames};

type Handler = Box<dyn Fn(&Event) -> Result<(), DepositError> + Send + Sync>;

/// Counts from one [`EventRouter::pump`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub handled: usize,
    pub failed: usize,
}

impl PumpStats {
    pub fn delivered(&self) -> usize {
        self.handled + self.failed
    }
}

/// Routes incoming events to the handler registered for their type.
pub struct EventRouter {
    channels: ChannelNames,
    handlers: HashMap<String, Handler>,
    subscriptions: Vec<String>,
}

impl EventRouter {
    pub fn new(channels: ChannelNames) -> Self {
        Self {
            channels,
            handlers: HashMap::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Register the handler for `E` and subscribe to `E`'s channel.
    pub fn on<E, F>(mut self, handler: F) -> Self
    where
        E: ChannelEvent,
        F: Fn(E) -> Result<(), DepositError> + Send + Sync + 'static,
    {
        let channel = self.channels.name(E::CHANNEL).to_string();
        if !self.subscriptions.contains(&channel) {
            self.subscriptions.push(channel);
        }

        self.handlers.insert(
            E::EVENT_TYPE.to_string(),
            Box::new(move |event: &Event| {
                let payload: E = event.decode()?;
                handler(payload)
            }),
        );
        self
    }

    /// Decode `event` and run its handler.
    pub fn dispatch(&self, event: &Event) -> Result<(), DepositError> {
        let handler = self
            .handlers
            .get(&event.event_type)
            .ok_or_else(|| DepositError::UnknownEvent(event.event_type.clone()))?;
        handler(event)
    }

    /// Channel names this router consumes, in registration order.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn event_types(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    /// Deliver every event currently waiting on the subscribed channels.
    ///
    /// Handler failures are logged and counted; the event is consumed
    /// either way.
    pub fn pump<L: Listener + ?Sized>(&self, listener: &L) -> Result<PumpStats, PublishError> {
        let mut stats = PumpStats::default();
        for channel in &self.subscriptions {
            while let Some(event) = listener.listen(channel, 0)? {
                self.deliver(channel, &event, &mut stats);
            }
        }
        Ok(stats)
    }

    pub(super) fn deliver(&self, channel: &str, event: &Event, stats: &mut PumpStats) {
        match self.dispatch(event) {
            Ok(()) => {
                stats.handled += 1;
                debug!(channel, event_id = %event.id, event_type = %event.event_type, "event handled");
            }
            Err(err) if err.is_client_error() => {
                stats.failed += 1;
                warn!(
                    channel,
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %err,
                    "event rejected"
                );
            }
            Err(err) => {
                stats.failed += 1;
                error!(
                    channel,
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }
}
