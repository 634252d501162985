use super::{Event, PublishError};

/// Receives events from a named channel.
///
/// Listeners on the same channel compete: each event is delivered to
/// exactly one of them.
pub trait Listener: Send + Sync {
    /// Wait up to `timeout_ms` for the next event on `channel`.
    fn listen(&self, channel: &str, timeout_ms: u64) -> Result<Option<Event>, PublishError>;
}
