//! Wire and domain types shared between server and client.
//!
//! `Room` and `EncryptedMessage` are owned and mutated exclusively by the
//! server-side store; the client only ever receives copies.
//! `DecryptedMessage` exists on the client alone and is recomputed from
//! ciphertext on every sync, never persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room identifier. Globally unique and stable for the room's lifetime.
pub type RoomId = Uuid;

/// User identifier.
///
/// Distinct from the username: the id is a stable opaque key, the username
/// is a unique but display-facing login handle.
pub type UserId = Uuid;

/// Message identifier. Unique within a room.
pub type MessageId = Uuid;

/// Length of the AEAD nonce prefixed to every stored ciphertext.
///
/// Part of the wire contract: `ciphertext = nonce || aead_output`. The
/// server enforces `ciphertext.len() >= NONCE_LEN` on append even though it
/// never interprets the bytes.
pub const NONCE_LEN: usize = 12;

/// A chat room: name, owner, and grow-only membership.
///
/// The owner is a member from creation. Membership never shrinks (no
/// leave/kick); `member_ids` preserves join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Stable unique room id.
    pub id: RoomId,
    /// Display name chosen at creation.
    pub name: String,
    /// Creator of the room.
    pub owner_id: UserId,
    /// Members in join order. Contains `owner_id` from creation on.
    pub member_ids: Vec<UserId>,
}

impl Room {
    /// Whether `user_id` is a member of this room.
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.member_ids.contains(&user_id)
    }
}

/// An opaque encrypted message as stored and relayed by the server.
///
/// Immutable once appended to a room's log. The ciphertext carries its
/// nonce as a prefix and is meaningless without the room key, which the
/// server never sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// Message id, unique within the room.
    pub id: MessageId,
    /// Room this message belongs to.
    pub room_id: RoomId,
    /// Asserted sender identity (transport-level, not cryptographically
    /// bound).
    pub sender_id: UserId,
    /// `nonce || AEAD(key, nonce, plaintext)`, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Server-assigned wall-clock timestamp in milliseconds. Ties are
    /// broken by append order.
    pub timestamp: i64,
}

/// Public user profile, as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable user id.
    pub id: UserId,
    /// Unique login handle, doubles as display name.
    pub username: String,
    /// Optional avatar image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A decrypted message ready for display. Client-only, derived state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    /// Id of the underlying encrypted message.
    pub id: MessageId,
    /// Room this message belongs to.
    pub room_id: RoomId,
    /// Resolved sender profile (placeholder profile if resolution failed).
    pub sender: UserProfile,
    /// The decrypted plaintext.
    pub text: String,
    /// Server-assigned timestamp in milliseconds.
    pub timestamp: i64,
    /// Whether the local session's user sent this message.
    pub is_own_message: bool,
}

/// Serde adapter encoding byte vectors as standard base64 strings.
///
/// Transport encoding is a boundary concern: in-memory ciphertext stays raw
/// bytes, only the JSON representation is text.
pub mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Serialize bytes as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize a base64 string into bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}
