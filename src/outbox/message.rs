use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bus::Event;
use crate::events::{ChannelEvent, ChannelNames};
use crate::ledger::Record;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    #[default]
    Pending,
    InFlight,
    Published,
    Failed,
}

/// An event waiting to be relayed to its channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: String,
    /// Commit order; messages are relayed in ascending sequence.
    pub sequence: u64,
    pub channel: String,
    pub event_type: String,
    /// JSON payload.
    pub payload: String,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub worker_id: Option<String>,
    pub leased_until: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub correlation_id: Option<String>,
}

impl OutboxMessage {
    pub const ID_PREFIX: &'static str = "outbox:";

    /// Serialize `event` for the channel its role maps to.
    pub fn encode<E: ChannelEvent>(
        sequence: u64,
        channels: &ChannelNames,
        event: &E,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: format!("{}{:012}", Self::ID_PREFIX, sequence),
            sequence,
            channel: channels.name(E::CHANNEL).to_string(),
            event_type: E::EVENT_TYPE.to_string(),
            payload: serde_json::to_string(event)?,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            worker_id: None,
            leased_until: None,
            published_at: None,
            correlation_id: None,
        })
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    pub fn is_in_flight(&self) -> bool {
        self.status == OutboxStatus::InFlight
    }

    pub fn is_published(&self) -> bool {
        self.status == OutboxStatus::Published
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutboxStatus::Failed
    }

    /// Pending, or in flight with an expired lease.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            OutboxStatus::Pending => true,
            OutboxStatus::InFlight => self.leased_until.map_or(true, |until| until <= now),
            OutboxStatus::Published | OutboxStatus::Failed => false,
        }
    }

    pub fn claim(&mut self, worker_id: &str, lease: Duration, now: DateTime<Utc>) {
        let lease = chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::days(1));
        self.status = OutboxStatus::InFlight;
        self.attempts += 1;
        self.worker_id = Some(worker_id.to_string());
        self.leased_until = Some(now + lease);
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = OutboxStatus::Published;
        self.published_at = Some(now);
        self.leased_until = None;
    }

    /// Back to pending for another attempt.
    pub fn release(&mut self, error: &str) {
        self.status = OutboxStatus::Pending;
        self.last_error = Some(error.to_string());
        self.worker_id = None;
        self.leased_until = None;
    }

    /// Undo a claim whose send was never attempted.
    pub fn unclaim(&mut self) {
        self.status = OutboxStatus::Pending;
        self.attempts = self.attempts.saturating_sub(1);
        self.worker_id = None;
        self.leased_until = None;
    }

    pub fn fail(&mut self, error: &str) {
        self.status = OutboxStatus::Failed;
        self.last_error = Some(error.to_string());
        self.leased_until = None;
    }

    /// Reset a failed message so the relay picks it up again.
    pub fn redrive(&mut self) {
        self.status = OutboxStatus::Pending;
        self.attempts = 0;
        self.worker_id = None;
        self.leased_until = None;
    }

    /// The bus event for this message.
    pub fn to_event(&self) -> Event {
        let event = Event::new(&self.id, &self.event_type, self.payload.clone().into_bytes())
            .with_metadata("channel", &self.channel);
        match &self.correlation_id {
            Some(id) => event.with_metadata("correlation_id", id),
            None => event,
        }
    }
}

impl Record for OutboxMessage {
    const COLLECTION: &'static str = "outbox";

    fn id(&self) -> String {
        self.id.clone()
    }
}
