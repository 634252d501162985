//! In-memory channels for tests and the in-process simulation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use super::{Event, Listener, PublishError, Sender};

#[derive(Default)]
struct Channels {
    queues: HashMap<String, VecDeque<Event>>,
    /// Every event sent per channel. Only kept by recording queues.
    history: Option<HashMap<String, Vec<Event>>>,
}

/// Thread-safe set of named FIFO channels.
///
/// Clones share the same channels, so one handle can be given to a sender
/// thread and another to a listener thread. A queue built with
/// [`InMemoryQueue::recording`] also keeps every sent event for inspection;
/// a plain one forgets events once they are consumed.
///
/// ```
/// use deposit_service::bus::{Event, InMemoryQueue, Listener, Sender};
///
/// let queue = InMemoryQueue::new();
/// queue.send("deposits", Event::new("evt-1", "Ping", b"{}".to_vec())).unwrap();
///
/// let event = queue.listen("deposits", 10).unwrap().unwrap();
/// assert_eq!(event.event_type, "Ping");
/// assert!(queue.listen("deposits", 0).unwrap().is_none());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    channels: Arc<Mutex<Channels>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that remembers every event sent through it.
    pub fn recording() -> Self {
        Self {
            channels: Arc::new(Mutex::new(Channels {
                history: Some(HashMap::new()),
                ..Channels::default()
            })),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.with_channels(|c| c.history.is_some()).unwrap_or(false)
    }

    fn with_channels<T>(&self, f: impl FnOnce(&mut Channels) -> T) -> Result<T, PublishError> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| PublishError::ConnectionFailed("queue lock poisoned".into()))?;
        Ok(f(&mut channels))
    }

    fn try_take(&self, channel: &str) -> Result<Option<Event>, PublishError> {
        self.with_channels(|c| c.queues.get_mut(channel).and_then(VecDeque::pop_front))
    }

    /// Events waiting to be consumed on a channel.
    pub fn pending(&self, channel: &str) -> usize {
        self.with_channels(|c| c.queues.get(channel).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Every event sent to a channel, consumed or not. Always empty unless
    /// the queue is recording.
    pub fn sent(&self, channel: &str) -> Vec<Event> {
        self.with_channels(|c| {
            c.history
                .as_ref()
                .and_then(|h| h.get(channel).cloned())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Payloads of every event sent to a channel, decoded as `T`.
    pub fn sent_as<T: DeserializeOwned>(&self, channel: &str) -> Result<Vec<T>, serde_json::Error> {
        self.sent(channel).iter().map(|e| e.decode()).collect()
    }

    /// Drop all queued events and history.
    pub fn clear(&self) {
        let _ = self.with_channels(|c| {
            c.queues.clear();
            if let Some(history) = c.history.as_mut() {
                history.clear();
            }
        });
    }
}

impl Sender for InMemoryQueue {
    fn send(&self, channel: &str, event: Event) -> Result<(), PublishError> {
        self.with_channels(|c| {
            if let Some(history) = c.history.as_mut() {
                history
                    .entry(channel.to_string())
                    .or_default()
                    .push(event.clone());
            }
            c.queues
                .entry(channel.to_string())
                .or_default()
                .push_back(event);
        })
    }
}

impl Listener for InMemoryQueue {
    fn listen(&self, channel: &str, timeout_ms: u64) -> Result<Option<Event>, PublishError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Some(event) = self.try_take(channel)? {
                return Ok(Some(event));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}
