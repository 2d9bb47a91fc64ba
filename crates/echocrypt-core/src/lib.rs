//! EchoCrypt shared foundation.
//!
//! This crate holds the pieces both endpoints agree on:
//!
//! - `types` - Wire and domain types (rooms, messages, profiles)
//! - `env` - Environment abstraction for time, sleep, and randomness
//!
//! The server stores and relays [`types::EncryptedMessage`] records without
//! ever holding key material; everything the client derives from them
//! ([`types::DecryptedMessage`]) stays on the client side.

pub mod env;
pub mod types;

pub use env::{Environment, SystemEnv};
pub use types::{
    DecryptedMessage, EncryptedMessage, MessageId, NONCE_LEN, Room, RoomId, UserId, UserProfile,
};
