use super::{Event, PublishError};

/// Sends events to a named channel (point-to-point).
pub trait Sender: Send + Sync {
    fn send(&self, channel: &str, event: Event) -> Result<(), PublishError>;
}
