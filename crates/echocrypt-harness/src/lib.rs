//! In-process end-to-end harness.
//!
//! `LocalBackend` holds a real [`RoomStore`] and [`UserDirectory`];
//! [`LocalTransport`] speaks the client's transport trait directly against
//! them, skipping HTTP. Full client-to-client flows (create, invite, join,
//! send, sync) run deterministically in one process under an injected
//! environment, with the same authorization checks the HTTP surface
//! enforces.

use std::sync::Arc;

use async_trait::async_trait;
use echocrypt_client::{ChatTransport, Session, TransportError};
use echocrypt_core::{EncryptedMessage, Environment, Room, RoomId, UserId, UserProfile};
use echocrypt_server::{AuthError, RoomStore, StoreError, UserDirectory};

/// Shared server-side state for an in-process deployment.
pub struct LocalBackend<E: Environment> {
    env: E,
    store: Arc<RoomStore<E>>,
    directory: Arc<UserDirectory<E>>,
}

impl<E: Environment> LocalBackend<E> {
    /// Create an empty backend on the given environment.
    pub fn new(env: E) -> Self {
        Self {
            store: Arc::new(RoomStore::new(env.clone())),
            directory: Arc::new(UserDirectory::new(env.clone())),
            env,
        }
    }

    /// Register a user and hand back a live session for them.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UsernameTaken` if the handle is in use.
    pub fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Session<LocalTransport<E>, E>, AuthError> {
        let (profile, _token) = self.directory.register(username, password)?;
        let transport = LocalTransport {
            store: Arc::clone(&self.store),
            directory: Arc::clone(&self.directory),
            user_id: profile.id,
        };
        Ok(Session::new(profile, transport, self.env.clone()))
    }

    /// Direct access to the store for server-side assertions.
    pub fn store(&self) -> &RoomStore<E> {
        &self.store
    }

    /// Direct access to the directory for server-side assertions.
    pub fn directory(&self) -> &UserDirectory<E> {
        &self.directory
    }
}

/// A transport bound to one authenticated user, calling server components
/// directly.
pub struct LocalTransport<E: Environment> {
    store: Arc<RoomStore<E>>,
    directory: Arc<UserDirectory<E>>,
    user_id: UserId,
}

impl<E: Environment> Clone for LocalTransport<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            directory: Arc::clone(&self.directory),
            user_id: self.user_id,
        }
    }
}

fn store_error(e: StoreError) -> TransportError {
    match e {
        StoreError::RoomNotFound(_) => TransportError::NotFound(e.to_string()),
        StoreError::NotAMember { .. } => TransportError::Forbidden(e.to_string()),
        StoreError::CiphertextTooShort { .. } => TransportError::Rejected(e.to_string()),
    }
}

#[async_trait]
impl<E: Environment> ChatTransport for LocalTransport<E> {
    async fn create_room(&self, name: &str) -> Result<Room, TransportError> {
        Ok(self.store.create_room(name, self.user_id))
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, TransportError> {
        Ok(self.store.rooms_for_user(self.user_id))
    }

    async fn join_room(&self, room_id: RoomId) -> Result<Room, TransportError> {
        self.store.join(room_id, self.user_id).map_err(store_error)
    }

    async fn list_messages(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<EncryptedMessage>, TransportError> {
        self.store.list_messages(room_id, self.user_id).map_err(store_error)
    }

    async fn send_message(
        &self,
        room_id: RoomId,
        ciphertext: Vec<u8>,
    ) -> Result<EncryptedMessage, TransportError> {
        self.store.append_message(room_id, self.user_id, ciphertext).map_err(store_error)
    }

    async fn fetch_users(&self, ids: &[UserId]) -> Result<Vec<UserProfile>, TransportError> {
        Ok(self.directory.lookup_many(ids))
    }
}
