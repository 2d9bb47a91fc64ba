//! Server API surface consumed by the session.
//!
//! A `ChatTransport` is already authenticated: implementations carry their
//! bearer token (or equivalent) internally. The session never sees
//! credentials, only this narrowed API.

use async_trait::async_trait;
use echocrypt_core::{EncryptedMessage, Room, RoomId, UserId, UserProfile};
use thiserror::Error;

/// Errors surfaced by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The referenced room or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server refused the operation (non-member access).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The server rejected the request as malformed.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The request never completed: connectivity, timeout, server down.
    /// The only transport error worth retrying.
    #[error("network failure: {0}")]
    Network(String),
}

/// The store-and-relay API as seen from an authenticated client.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Create a room owned by this client's user.
    async fn create_room(&self, name: &str) -> Result<Room, TransportError>;

    /// All rooms this client's user belongs to.
    async fn list_rooms(&self) -> Result<Vec<Room>, TransportError>;

    /// Join a room (idempotent server-side).
    async fn join_room(&self, room_id: RoomId) -> Result<Room, TransportError>;

    /// Pull a room's full ciphertext log in append order.
    async fn list_messages(&self, room_id: RoomId)
    -> Result<Vec<EncryptedMessage>, TransportError>;

    /// Append a ciphertext to a room's log.
    async fn send_message(
        &self,
        room_id: RoomId,
        ciphertext: Vec<u8>,
    ) -> Result<EncryptedMessage, TransportError>;

    /// Batched profile lookup; unknown ids are omitted from the result.
    async fn fetch_users(&self, ids: &[UserId]) -> Result<Vec<UserProfile>, TransportError>;
}
