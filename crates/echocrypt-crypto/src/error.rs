//! Crypto and invite error types.

use thiserror::Error;

/// Errors from key handling and message encryption/decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material could not be imported.
    #[error("key import failed: {reason}")]
    KeyImport {
        /// Why the key bytes were rejected.
        reason: String,
    },

    /// Ciphertext is shorter than the mandatory nonce prefix.
    #[error("ciphertext too short: {len} bytes, nonce prefix alone is {min}")]
    CiphertextTooShort {
        /// Actual ciphertext length.
        len: usize,
        /// Minimum acceptable length.
        min: usize,
    },

    /// The AEAD rejected the input: wrong key or tampered data.
    #[error("authentication failed: wrong key or tampered ciphertext")]
    Aead,

    /// Decryption succeeded but the plaintext is not valid UTF-8.
    #[error("decrypted bytes are not valid text")]
    InvalidPlaintext,
}

/// Errors from parsing an invite locator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    /// The locator has no `/invite/<roomId>` path segment.
    #[error("invite locator is missing the room id segment")]
    MissingRoomId,

    /// The room id segment is present but not a valid id.
    #[error("invite room id is malformed: {segment}")]
    InvalidRoomId {
        /// The offending path segment.
        segment: String,
    },

    /// The locator has no `#` fragment carrying the key.
    #[error("invite locator is missing the key fragment")]
    MissingKey,

    /// The key fragment is present but does not decode to a valid key.
    #[error("invite key fragment is malformed")]
    InvalidKey,
}
