use std::sync::mpsc::{channel, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use super::router::{EventRouter, PumpStats};
use crate::bus::Listener;

/// Statistics from a listener thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransportStats {
    /// Events whose handler succeeded.
    pub handled: usize,
    /// Events whose handler failed or that had no handler.
    pub failed: usize,
    pub polls: usize,
}

/// Handle to a background listener thread. Drop or call `stop()` to shut down.
pub struct TransportHandle {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<TransportStats>>,
}

impl TransportHandle {
    /// Stop the transport and wait for it to finish. Returns stats.
    pub fn stop(mut self) -> TransportStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => TransportStats::default(),
        }
    }

    /// Signal stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

/// Consume the router's channels on a background thread.
///
/// Each event is taken by exactly one listener, so several threads (or
/// processes) can compete on the same channels. When a poll round finds
/// nothing the thread waits `poll_interval` before the next one.
pub fn listen<L>(
    router: Arc<EventRouter>,
    listener: L,
    name: &str,
    poll_interval: Duration,
) -> TransportHandle
where
    L: Listener + 'static,
{
    let (stop_tx, stop_rx) = channel();
    let thread_name = name.to_string();

    let handle = thread::Builder::new().name(thread_name.clone()).spawn(move || {
        let mut stats = TransportStats::default();
        info!(listener = %thread_name, channels = ?router.subscriptions(), "listener started");

        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            stats.polls += 1;

            let mut round = PumpStats::default();
            for channel in router.subscriptions() {
                match listener.listen(channel, 0) {
                    Ok(Some(event)) => router.deliver(channel, &event, &mut round),
                    Ok(None) => {}
                    Err(err) => error!(channel = %channel, error = %err, "listen failed"),
                }
            }
            stats.handled += round.handled;
            stats.failed += round.failed;

            if round.delivered() == 0 {
                match stop_rx.recv_timeout(poll_interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }

        info!(listener = %thread_name, handled = stats.handled, failed = stats.failed, "listener stopped");
        stats
    });

    match handle {
        Ok(handle) => TransportHandle {
            stop_tx,
            handle: Some(handle),
        },
        Err(err) => {
            error!(listener = name, error = %err, "failed to spawn listener thread");
            TransportHandle {
                stop_tx,
                handle: None,
            }
        }
    }
}
