//! Room State Store
//!
//! Server-authoritative state: an append-only ciphertext log plus a
//! grow-only membership list per room. The store never sees plaintext or
//! key material; ciphertext is opaque bytes it validates only for the
//! nonce-prefix length invariant.
//!
//! ## Concurrency
//!
//! A registry lock maps room ids to per-room records, each behind its own
//! lock. Appends take the room's write lock, so concurrent appends to one
//! room serialize cleanly: no interleaved partial writes, no lost updates.
//! Reads take the room's read lock and observe a consistent snapshot.
//!
//! Membership is re-checked on every read and write; the store never
//! trusts a cached decision from an earlier call.

use std::collections::HashMap;
use std::sync::Arc;

use echocrypt_core::{EncryptedMessage, Environment, NONCE_LEN, Room, RoomId, UserId};
use parking_lot::RwLock;

/// Errors from Room State Store operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// Room does not exist.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// Caller is not a member of the room.
    #[error("user {user_id} is not a member of room {room_id}")]
    NotAMember {
        /// Room the caller tried to access.
        room_id: RoomId,
        /// The non-member caller.
        user_id: UserId,
    },

    /// Ciphertext cannot even hold the mandatory nonce prefix.
    #[error("ciphertext too short: {len} bytes, nonce prefix alone is {NONCE_LEN}")]
    CiphertextTooShort {
        /// Rejected ciphertext length.
        len: usize,
    },
}

/// A room plus its append-only message log.
#[derive(Debug)]
struct RoomRecord {
    room: Room,
    messages: Vec<EncryptedMessage>,
}

/// In-memory Room State Store.
///
/// One logical instance is authoritative per room; there is no replication
/// or consensus in scope.
pub struct RoomStore<E: Environment> {
    env: E,
    rooms: RwLock<HashMap<RoomId, Arc<RwLock<RoomRecord>>>>,
}

impl<E: Environment> RoomStore<E> {
    /// Create an empty store.
    pub fn new(env: E) -> Self {
        Self { env, rooms: RwLock::new(HashMap::new()) }
    }

    /// Create a room with a fresh unique id and membership `{owner_id}`.
    pub fn create_room(&self, name: &str, owner_id: UserId) -> Room {
        let room = Room {
            id: self.env.random_id(),
            name: name.to_string(),
            owner_id,
            member_ids: vec![owner_id],
        };

        let record = RoomRecord { room: room.clone(), messages: Vec::new() };
        self.rooms.write().insert(room.id, Arc::new(RwLock::new(record)));

        tracing::info!(room_id = %room.id, owner_id = %owner_id, "room created");
        room
    }

    /// Add a user to a room's membership. Idempotent: adding an existing
    /// member is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::RoomNotFound` if the room is unknown.
    pub fn join(&self, room_id: RoomId, user_id: UserId) -> Result<Room, StoreError> {
        let record = self.record(room_id)?;
        let mut record = record.write();

        if !record.room.is_member(user_id) {
            record.room.member_ids.push(user_id);
            tracing::info!(room_id = %room_id, user_id = %user_id, "member joined");
        }

        Ok(record.room.clone())
    }

    /// Append a ciphertext to a room's log, assigning id and server
    /// timestamp. Atomic with respect to concurrent appends to the same
    /// room.
    ///
    /// # Errors
    ///
    /// - `StoreError::RoomNotFound` if the room is unknown
    /// - `StoreError::NotAMember` if the sender is not a member
    /// - `StoreError::CiphertextTooShort` if the ciphertext violates the
    ///   nonce-prefix invariant
    pub fn append_message(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        ciphertext: Vec<u8>,
    ) -> Result<EncryptedMessage, StoreError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(StoreError::CiphertextTooShort { len: ciphertext.len() });
        }

        let record = self.record(room_id)?;
        let mut record = record.write();

        if !record.room.is_member(sender_id) {
            return Err(StoreError::NotAMember { room_id, user_id: sender_id });
        }

        let message = EncryptedMessage {
            id: self.env.random_id(),
            room_id,
            sender_id,
            ciphertext,
            timestamp: self.env.now_millis(),
        };

        record.messages.push(message.clone());
        Ok(message)
    }

    /// Return a room's full message log in append order.
    ///
    /// Append order equals timestamp order, with timestamp ties broken by
    /// append order.
    ///
    /// # Errors
    ///
    /// - `StoreError::RoomNotFound` if the room is unknown
    /// - `StoreError::NotAMember` if the caller is not a member
    pub fn list_messages(
        &self,
        room_id: RoomId,
        caller_id: UserId,
    ) -> Result<Vec<EncryptedMessage>, StoreError> {
        let record = self.record(room_id)?;
        let record = record.read();

        if !record.room.is_member(caller_id) {
            return Err(StoreError::NotAMember { room_id, user_id: caller_id });
        }

        Ok(record.messages.clone())
    }

    /// Look up a room by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::RoomNotFound` if the room is unknown.
    pub fn room(&self, room_id: RoomId) -> Result<Room, StoreError> {
        Ok(self.record(room_id)?.read().room.clone())
    }

    /// All rooms the user belongs to.
    pub fn rooms_for_user(&self, user_id: UserId) -> Vec<Room> {
        let registry = self.rooms.read();
        registry
            .values()
            .filter_map(|record| {
                let record = record.read();
                record.room.is_member(user_id).then(|| record.room.clone())
            })
            .collect()
    }

    fn record(&self, room_id: RoomId) -> Result<Arc<RwLock<RoomRecord>>, StoreError> {
        self.rooms.read().get(&room_id).cloned().ok_or(StoreError::RoomNotFound(room_id))
    }
}

impl<E: Environment> std::fmt::Debug for RoomStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomStore").field("room_count", &self.rooms.read().len()).finish()
    }
}
