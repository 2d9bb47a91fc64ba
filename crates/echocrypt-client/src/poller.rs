//! Fixed-interval sync driver for the active room.
//!
//! Polling follows room focus: exactly one room is polled at a time, and
//! switching rooms stops the old task before the new one starts. Each tick
//! goes through [`Session::sync`], so the per-room in-flight guard applies
//! to poll ticks and manual syncs alike.

use std::sync::Arc;
use std::time::Duration;

use echocrypt_core::{Environment, RoomId};
use tokio::task::JoinHandle;

use crate::session::Session;
use crate::transport::ChatTransport;

/// Default interval between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

struct ActivePoll {
    room_id: RoomId,
    handle: JoinHandle<()>,
}

/// Drives periodic sync for whichever room currently has focus.
pub struct Poller<T: ChatTransport + 'static, E: Environment> {
    session: Arc<Session<T, E>>,
    interval: Duration,
    active: Option<ActivePoll>,
}

impl<T: ChatTransport + 'static, E: Environment> Poller<T, E> {
    /// Create a poller with the default interval.
    pub fn new(session: Arc<Session<T, E>>) -> Self {
        Self::with_interval(session, DEFAULT_POLL_INTERVAL)
    }

    /// Create a poller with a custom interval.
    pub fn with_interval(session: Arc<Session<T, E>>, interval: Duration) -> Self {
        Self { session, interval, active: None }
    }

    /// The room currently being polled, if any.
    pub fn active_room(&self) -> Option<RoomId> {
        self.active.as_ref().map(|a| a.room_id)
    }

    /// Switch polling to `room_id`, or stop polling entirely on `None`.
    ///
    /// The previous task is aborted before any new one starts, so two rooms
    /// are never polled concurrently. Setting the room that is already
    /// active is a no-op. The new task syncs immediately, then on every
    /// interval tick; sync failures are logged and the loop keeps going.
    pub fn set_active_room(&mut self, room_id: Option<RoomId>) {
        if self.active_room() == room_id {
            return;
        }

        if let Some(previous) = self.active.take() {
            previous.handle.abort();
            tracing::debug!(room_id = %previous.room_id, "stopped polling");
        }

        let Some(room_id) = room_id else {
            return;
        };

        let session = Arc::clone(&self.session);
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let env = session.env().clone();
            loop {
                match session.sync(room_id).await {
                    Ok(outcome) => {
                        tracing::trace!(room_id = %room_id, ?outcome, "poll tick");
                    },
                    Err(e) if e.is_recoverable() => {
                        tracing::debug!(room_id = %room_id, error = %e, "poll tick failed");
                    },
                    Err(e) => {
                        tracing::warn!(room_id = %room_id, error = %e, "poll tick failed");
                    },
                }
                env.sleep(interval).await;
            }
        });

        self.active = Some(ActivePoll { room_id, handle });
        tracing::debug!(room_id = %room_id, "started polling");
    }
}

impl<T: ChatTransport + 'static, E: Environment> Drop for Poller<T, E> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.abort();
        }
    }
}
