//! Replay-one multicast sink for authentication errors.

use crate::error::AuthError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

const LIVE_CAPACITY: usize = 64;

/// Replays `latest`, then forwards every value sent on `live`.
///
/// A subscriber that falls more than the channel capacity behind skips the
/// missed values and logs how many were lost.
pub(crate) fn replay_then_live<T>(
    latest: Option<T>,
    live: broadcast::Receiver<T>,
) -> impl Stream<Item = T> + Send + 'static
where
    T: Clone + Send + 'static,
{
    tokio_stream::iter(latest).chain(BroadcastStream::new(live).filter_map(|item| match item {
        Ok(value) => Some(value),
        Err(lagged) => {
            tracing::warn!("Slow subscriber skipped updates: {}", lagged);
            None
        }
    }))
}

#[derive(Debug, Default)]
struct Slot {
    latest: Option<AuthError>,
    closed: bool,
}

#[derive(Debug)]
struct Inner {
    slot: Mutex<Slot>,
    live: broadcast::Sender<AuthError>,
    suppress_silent: AtomicBool,
}

/// Records the most recent authentication error and replays it to every new
/// subscriber. Subscribers that are already listening receive every error.
/// Cloning shares the channel.
#[derive(Clone, Debug)]
pub struct ErrorChannel {
    inner: Arc<Inner>,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorChannel {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot::default()),
                live,
                suppress_silent: AtomicBool::new(false),
            }),
        }
    }

    /// When enabled, `login_required` and `consent_required` are not recorded.
    pub fn set_suppress_silent_auth_errors(&self, suppress: bool) {
        self.inner.suppress_silent.store(suppress, Ordering::SeqCst);
    }

    /// Records `error` and notifies subscribers.
    ///
    /// Returns false if the error was suppressed or the channel is closed.
    pub fn record(&self, error: AuthError) -> bool {
        if self.inner.suppress_silent.load(Ordering::SeqCst) && error.is_silent_auth_failure() {
            tracing::debug!("Not recording silent authentication error: {}", error);
            return false;
        }

        let mut slot = self.slot();
        if slot.closed {
            tracing::debug!("Dropping error on closed channel: {}", error);
            return false;
        }
        tracing::trace!("Recording authentication error: {}", error);
        slot.latest = Some(error.clone());
        // No receivers is fine, the error stays in the slot for replay
        let _ = self.inner.live.send(error);
        true
    }

    /// Stops accepting errors. The latest one stays readable.
    pub fn close(&self) {
        self.slot().closed = true;
    }

    pub fn latest(&self) -> Option<AuthError> {
        self.slot().latest.clone()
    }

    /// Stream of errors, starting with the latest one if any was recorded.
    pub fn subscribe(&self) -> impl Stream<Item = AuthError> + Send + 'static {
        // Subscribing under the lock so no error is both replayed and delivered live
        let slot = self.slot();
        let live = self.inner.live.subscribe();
        let latest = slot.latest.clone();
        drop(slot);
        replay_then_live(latest, live)
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.inner
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
