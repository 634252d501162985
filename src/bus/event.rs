use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// An event travelling on a channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: String,
    /// Event type, e.g. `"WithdrawalSettled"`.
    pub event_type: String,
    /// JSON payload.
    pub payload: Vec<u8>,
    /// Optional headers (correlation ids, origin channel).
    pub metadata: Option<Vec<(String, String)>>,
}

impl Event {
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            payload,
            metadata: None,
        }
    }

    /// Create an event with a JSON-serialized payload.
    pub fn encode<T: Serialize>(
        id: impl Into<String>,
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, PublishError> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| PublishError::SerializationFailed(e.to_string()))?;
        Ok(Self::new(id, event_type, bytes))
    }

    /// Decode the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Payload as text, if valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Error type for send / listen operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("serialization failed: {0}")]
    SerializationFailed(String),
    #[error("event rejected: {0}")]
    Rejected(String),
    #[error("publish timeout")]
    Timeout,
}
