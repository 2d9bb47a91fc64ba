//! Session-scoped client state.
//!
//! A `Session` owns everything one authenticated user derives from the
//! server: cached room keys, the decrypted message cache, and resolved
//! sender profiles. It is an explicit state object tied to the session
//! lifecycle, not a process-wide singleton.
//!
//! ## Cache discipline
//!
//! - The decrypted cache for a room is always replaced wholesale from the
//!   latest successful pull, never merged incrementally, so the view is
//!   consistent with a single server snapshot.
//! - At most one sync is in flight per room; a sync requested while one is
//!   outstanding is dropped, not queued.
//! - A message whose room has no cached key is skipped, never a batch
//!   failure; losing a room key permanently orphans that room's history.
//!
//! The internal lock is never held across an await.

use std::collections::{HashMap, HashSet};

use echocrypt_core::{
    DecryptedMessage, EncryptedMessage, Environment, Room, RoomId, UserId, UserProfile,
};
use echocrypt_crypto::{RoomKey, cipher, invite};
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::transport::ChatTransport;

/// Result of a [`Session::sync`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The room's decrypted cache was replaced from a fresh snapshot.
    Updated {
        /// Number of messages now in the cache for this room.
        message_count: usize,
    },

    /// A sync for this room was already in flight; this request was
    /// dropped.
    AlreadyInFlight,
}

#[derive(Default)]
struct SessionState {
    rooms: Vec<Room>,
    keys: HashMap<RoomId, RoomKey>,
    messages: HashMap<RoomId, Vec<DecryptedMessage>>,
    profiles: HashMap<UserId, UserProfile>,
    in_flight: HashSet<RoomId>,
}

/// Clears a room's in-flight marker on drop, so the guard unwinds even
/// when the sync future is cancelled mid-await (the poller aborts its
/// task whenever the active room changes).
struct InFlightGuard<'a> {
    state: &'a Mutex<SessionState>,
    room_id: RoomId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight.remove(&self.room_id);
    }
}

/// One authenticated user's client-side state and operations.
pub struct Session<T: ChatTransport, E: Environment> {
    me: UserProfile,
    transport: T,
    env: E,
    state: Mutex<SessionState>,
}

impl<T: ChatTransport, E: Environment> Session<T, E> {
    /// Create a session for an authenticated user.
    pub fn new(me: UserProfile, transport: T, env: E) -> Self {
        let mut state = SessionState::default();
        // Our own profile never needs a directory round-trip
        state.profiles.insert(me.id, me.clone());
        Self { me, transport, env, state: Mutex::new(state) }
    }

    /// The authenticated user this session belongs to.
    pub fn user(&self) -> &UserProfile {
        &self.me
    }

    pub(crate) fn env(&self) -> &E {
        &self.env
    }

    /// Rooms known from the last refresh, in server order.
    pub fn rooms(&self) -> Vec<Room> {
        self.state.lock().rooms.clone()
    }

    /// The decrypted cache for a room, as of the last successful sync.
    pub fn messages(&self, room_id: RoomId) -> Vec<DecryptedMessage> {
        self.state.lock().messages.get(&room_id).cloned().unwrap_or_default()
    }

    /// Whether a key is cached for the room.
    pub fn has_key(&self, room_id: RoomId) -> bool {
        self.state.lock().keys.contains_key(&room_id)
    }

    /// Cache a room key (e.g., from a parsed invite or local storage).
    pub fn store_room_key(&self, room_id: RoomId, key: RoomKey) {
        self.state.lock().keys.insert(room_id, key);
    }

    /// Dump the key cache for persistence (base64 per key).
    ///
    /// Losing this map makes prior ciphertext permanently unrecoverable;
    /// there is no key-recovery path.
    pub fn export_keys(&self) -> HashMap<RoomId, String> {
        self.state.lock().keys.iter().map(|(id, key)| (*id, key.to_base64())).collect()
    }

    /// Reload a persisted key cache.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Crypto` on the first entry that fails to
    /// import; earlier entries stay cached.
    pub fn import_keys<I>(&self, entries: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = (RoomId, String)>,
    {
        for (room_id, encoded) in entries {
            let key = RoomKey::from_base64(&encoded)?;
            self.store_room_key(room_id, key);
        }
        Ok(())
    }

    /// Build an invite locator for a room this session holds the key for.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingKey` if no key is cached.
    pub fn make_invite(&self, origin: &str, room_id: RoomId) -> Result<String, SessionError> {
        let key = self.key_for(room_id)?;
        Ok(invite::make_invite(origin, room_id, &key))
    }

    /// Create a room server-side, then generate and cache its key locally.
    ///
    /// The key never leaves this client except through an invite locator.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transport` if creation fails (no key is
    /// generated in that case).
    pub async fn create_room(&self, name: &str) -> Result<Room, SessionError> {
        let room = self.transport.create_room(name).await?;
        let key = RoomKey::generate(&self.env);

        let mut state = self.state.lock();
        state.keys.insert(room.id, key);
        state.rooms.push(room.clone());

        Ok(room)
    }

    /// Consume an invite: cache the key, then join, then refresh rooms.
    ///
    /// The key is cached *before* the join request goes out, so a join
    /// that fails mid-flight can be retried without losing the key.
    ///
    /// # Errors
    ///
    /// - `SessionError::Invite` if the locator is malformed
    /// - `SessionError::Transport` if the join or refresh fails (the key
    ///   stays cached either way)
    pub async fn join_via_invite(&self, locator: &str) -> Result<Room, SessionError> {
        let (room_id, key) = invite::parse_invite(locator)?;

        self.store_room_key(room_id, key);

        let room = self.transport.join_room(room_id).await?;
        self.refresh_rooms().await?;

        Ok(room)
    }

    /// Replace the cached room list from the server.
    pub async fn refresh_rooms(&self) -> Result<Vec<Room>, SessionError> {
        let rooms = self.transport.list_rooms().await?;
        self.state.lock().rooms = rooms.clone();
        Ok(rooms)
    }

    /// Encrypt and send a message, then pull the room to pick it up.
    ///
    /// # Errors
    ///
    /// - `SessionError::MissingKey` if no key is cached for the room
    /// - `SessionError::Transport` if the send or follow-up pull fails
    pub async fn send_message(
        &self,
        room_id: RoomId,
        plaintext: &str,
    ) -> Result<SyncOutcome, SessionError> {
        let key = self.key_for(room_id)?;
        let ciphertext = cipher::encrypt(&self.env, &key, plaintext)?;

        self.transport.send_message(room_id, ciphertext).await?;

        // Pull immediately for responsiveness instead of waiting for the
        // next poll tick
        self.sync(room_id).await
    }

    /// Pull a room's ciphertext log and rebuild its decrypted cache.
    ///
    /// At most one sync per room is in flight; an overlapping request is
    /// dropped with [`SyncOutcome::AlreadyInFlight`]. The marker clears
    /// whether the sync finishes or is cancelled mid-await, so an
    /// abandoned sync never wedges the room. On success the room's cache
    /// is replaced wholesale from this single snapshot.
    ///
    /// # Errors
    ///
    /// - `SessionError::MissingKey` if no key is cached (checked before
    ///   any network traffic)
    /// - `SessionError::Transport` if the pull or sender resolution fails
    pub async fn sync(&self, room_id: RoomId) -> Result<SyncOutcome, SessionError> {
        {
            let mut state = self.state.lock();
            if state.in_flight.contains(&room_id) {
                tracing::debug!(room_id = %room_id, "sync already in flight, dropping request");
                return Ok(SyncOutcome::AlreadyInFlight);
            }
            if !state.keys.contains_key(&room_id) {
                return Err(SessionError::MissingKey { room_id });
            }
            state.in_flight.insert(room_id);
        }

        let _guard = InFlightGuard { state: &self.state, room_id };
        self.pull_and_replace(room_id).await
    }

    async fn pull_and_replace(&self, room_id: RoomId) -> Result<SyncOutcome, SessionError> {
        let batch = self.transport.list_messages(room_id).await?;
        let decrypted = self.resolve_and_decrypt(room_id, batch).await?;

        let message_count = decrypted.len();
        self.state.lock().messages.insert(room_id, decrypted);

        Ok(SyncOutcome::Updated { message_count })
    }

    /// Resolve sender identities and decrypt a pulled batch.
    ///
    /// Unknown senders are fetched in one batched lookup keyed by the
    /// distinct unresolved ids. A message that fails to decrypt is logged
    /// and dropped; a message whose room has no cached key is skipped
    /// silently. Neither aborts the batch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transport` only if the batched profile
    /// lookup itself fails.
    pub async fn resolve_and_decrypt(
        &self,
        room_id: RoomId,
        batch: Vec<EncryptedMessage>,
    ) -> Result<Vec<DecryptedMessage>, SessionError> {
        let unresolved: Vec<UserId> = {
            let state = self.state.lock();
            let mut seen = HashSet::new();
            batch
                .iter()
                .map(|m| m.sender_id)
                .filter(|id| seen.insert(*id) && !state.profiles.contains_key(id))
                .collect()
        };

        if !unresolved.is_empty() {
            let fetched = self.transport.fetch_users(&unresolved).await?;
            let mut state = self.state.lock();
            for profile in fetched {
                state.profiles.insert(profile.id, profile);
            }
        }

        let (keys, profiles) = {
            let state = self.state.lock();
            (state.keys.clone(), state.profiles.clone())
        };

        let mut decrypted = Vec::with_capacity(batch.len());
        for message in batch {
            let Some(key) = keys.get(&message.room_id) else {
                tracing::debug!(room_id = %message.room_id, "no key cached, skipping message");
                continue;
            };

            let text = match cipher::decrypt(key, &message.ciphertext) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        room_id = %room_id,
                        message_id = %message.id,
                        error = %e,
                        "dropping undecryptable message"
                    );
                    continue;
                },
            };

            let sender = profiles.get(&message.sender_id).cloned().unwrap_or_else(|| {
                UserProfile {
                    id: message.sender_id,
                    username: "unknown".to_string(),
                    avatar_url: None,
                }
            });

            decrypted.push(DecryptedMessage {
                id: message.id,
                room_id: message.room_id,
                is_own_message: message.sender_id == self.me.id,
                sender,
                text,
                timestamp: message.timestamp,
            });
        }

        Ok(decrypted)
    }

    fn key_for(&self, room_id: RoomId) -> Result<RoomKey, SessionError> {
        self.state.lock().keys.get(&room_id).cloned().ok_or(SessionError::MissingKey { room_id })
    }
}

impl<T: ChatTransport, E: Environment> std::fmt::Debug for Session<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Session")
            .field("user_id", &self.me.id)
            .field("room_count", &state.rooms.len())
            .field("key_count", &state.keys.len())
            .finish()
    }
}
