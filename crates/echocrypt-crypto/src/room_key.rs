//! The per-room symmetric secret.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use echocrypt_core::Environment;

use crate::error::CryptoError;

/// Room key length in bytes (256-bit AES-GCM key).
pub const KEY_LEN: usize = 32;

/// The single symmetric secret encrypting all messages in one room.
///
/// Created once by the room creator's client and shared only through the
/// invite fragment. There is no rotation: compromise of a room key is
/// permanent, and losing every copy makes the room's history unrecoverable.
#[derive(Clone, PartialEq, Eq)]
pub struct RoomKey([u8; KEY_LEN]);

impl RoomKey {
    /// Generate a fresh random key from the environment CSPRNG.
    pub fn generate<E: Environment>(env: &E) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        env.random_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encode the key as standard base64 for the invite fragment or local
    /// storage. Never send this to the server.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Import a key from its base64 encoding.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyImport` if the input is not base64 or does
    /// not decode to exactly [`KEY_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::KeyImport { reason: e.to_string() })?;

        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::KeyImport { reason: format!("expected {KEY_LEN} bytes, got {}", b.len()) }
        })?;

        Ok(Self(bytes))
    }
}

// Key material stays out of logs and debug output.
impl fmt::Debug for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RoomKey(..)")
    }
}
