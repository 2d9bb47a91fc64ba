//! Session error types.

use echocrypt_core::RoomId;
use echocrypt_crypto::{CryptoError, InviteError};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No key cached for the room. Unrecoverable without a new invite:
    /// deliberately distinct from [`SessionError::Transport`] so a display
    /// layer can tell "key missing" apart from "network failed".
    #[error("no room key cached for room {room_id}")]
    MissingKey {
        /// The room lacking a key.
        room_id: RoomId,
    },

    /// The transport failed or refused the request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encryption or key handling failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The invite locator could not be parsed.
    #[error(transparent)]
    Invite(#[from] InviteError),
}

impl SessionError {
    /// Whether retrying the same operation later can succeed.
    ///
    /// Only transient network failures qualify; a missing key, a malformed
    /// invite, or a server refusal will not fix themselves.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Network(_)))
    }
}
