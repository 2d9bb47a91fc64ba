//! EchoCrypt cryptographic primitives.
//!
//! This crate provides the message encryption and key distribution building
//! blocks: a per-room 256-bit AEAD key, single-message encrypt/decrypt with
//! the nonce carried as a ciphertext prefix, and the invite locator that
//! moves a room key out-of-band through a URL fragment.
//!
//! # Design
//!
//! Functions here are pure - same inputs, same outputs, no side effects.
//! Randomness (nonces, fresh keys) comes in through the
//! [`Environment`](echocrypt_core::Environment) so tests can be
//! deterministic while production draws from the OS entropy pool.
//!
//! # Security Properties
//!
//! - Tamper detection: AES-GCM authentication means decrypting with a wrong
//!   or corrupted key fails loudly instead of returning garbage
//! - Nonce uniqueness: every encryption draws a fresh random 96-bit nonce;
//!   the nonce travels with the ciphertext, never on a separate channel
//! - Key confinement: a [`RoomKey`] serializes only to the invite fragment
//!   or local storage, never into a server-bound payload

pub mod cipher;
pub mod error;
pub mod invite;
pub mod room_key;

#[cfg(test)]
pub(crate) mod testutil;

pub use cipher::{decrypt, encrypt, encrypt_with_nonce};
pub use error::{CryptoError, InviteError};
pub use invite::{make_invite, parse_invite};
pub use room_key::{KEY_LEN, RoomKey};
