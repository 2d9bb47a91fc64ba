//! EchoCrypt client session layer.
//!
//! Everything the browser-side core does between the wire and the UI:
//!
//! - `Session` - session-scoped state (room keys, decrypted cache, sender
//!   profiles) with encrypt-before-send and decrypt-on-pull
//! - `ChatTransport` - the server API surface the session consumes
//! - `Poller` - fixed-interval sync task for the active room
//!
//! The session never hands key material to the transport; ciphertext goes
//! out, ciphertext comes back, and plaintext exists only inside the
//! decrypted cache, which is rebuilt from each server snapshot and never
//! persisted.

pub mod error;
pub mod poller;
pub mod session;
pub mod transport;

pub use error::SessionError;
pub use poller::Poller;
pub use session::{Session, SyncOutcome};
pub use transport::{ChatTransport, TransportError};
