//! User directory and password authentication.
//!
//! Identity here is glue around the core: the server asserts sender
//! identity at the transport level, it does not cryptographically bind it.
//! User ids are generated and stable; the username is a separate unique
//! login handle that doubles as display name.
//!
//! Passwords are hashed with Argon2id (PHC string, random salt). Login
//! issues an opaque random bearer token mapped to the user id server-side.

use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params, Version};
use echocrypt_core::{Environment, UserId, UserProfile};
use parking_lot::RwLock;

/// Errors from registration, login, and token resolution.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Username is already registered.
    #[error("username already taken")]
    UsernameTaken,

    /// Unknown username or wrong password. Deliberately one variant: the
    /// two cases are indistinguishable to the caller.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Password hashing backend failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// An issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(pub String);

struct UserRecord {
    profile: UserProfile,
    password_hash: String,
}

#[derive(Default)]
struct DirectoryState {
    users: HashMap<UserId, UserRecord>,
    by_username: HashMap<String, UserId>,
    tokens: HashMap<String, UserId>,
}

/// In-memory user directory.
pub struct UserDirectory<E: Environment> {
    env: E,
    state: RwLock<DirectoryState>,
}

/// Argon2id parameters per current OWASP guidance (19 MiB, t=2, p=1).
fn argon2() -> Result<Argon2<'static>, AuthError> {
    let params =
        Params::new(19_456, 2, 1, None).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    match argon2()?.verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(e.to_string())),
    }
}

impl<E: Environment> UserDirectory<E> {
    /// Create an empty directory.
    pub fn new(env: E) -> Self {
        Self { env, state: RwLock::new(DirectoryState::default()) }
    }

    /// Register a new user and log them in.
    ///
    /// # Errors
    ///
    /// - `AuthError::UsernameTaken` if the handle is in use
    /// - `AuthError::Hashing` if the hash backend fails
    pub fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(UserProfile, AuthToken), AuthError> {
        // Hash outside the lock; Argon2 is deliberately slow.
        let password_hash = hash_password(password)?;

        let mut state = self.state.write();
        if state.by_username.contains_key(username) {
            return Err(AuthError::UsernameTaken);
        }

        let profile = UserProfile {
            id: self.env.random_id(),
            username: username.to_string(),
            avatar_url: Some(format!(
                "https://api.dicebear.com/8.x/bottts-neutral/svg?seed={username}"
            )),
        };

        state.by_username.insert(username.to_string(), profile.id);
        state.users.insert(profile.id, UserRecord { profile: profile.clone(), password_hash });

        let token = self.issue_token(&mut state, profile.id);
        tracing::info!(user_id = %profile.id, "user registered");

        Ok((profile, token))
    }

    /// Verify credentials and issue a fresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown username and
    /// for a wrong password alike.
    pub fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(UserProfile, AuthToken), AuthError> {
        let (user_id, profile, password_hash) = {
            let state = self.state.read();
            let user_id =
                *state.by_username.get(username).ok_or(AuthError::InvalidCredentials)?;
            let record = state.users.get(&user_id).ok_or(AuthError::InvalidCredentials)?;
            (user_id, record.profile.clone(), record.password_hash.clone())
        };

        if !verify_password(password, &password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(&mut self.state.write(), user_id);
        Ok((profile, token))
    }

    /// Resolve a bearer token to a user id.
    pub fn resolve_token(&self, token: &str) -> Option<UserId> {
        self.state.read().tokens.get(token).copied()
    }

    /// Look up a single profile.
    pub fn lookup(&self, user_id: UserId) -> Option<UserProfile> {
        self.state.read().users.get(&user_id).map(|r| r.profile.clone())
    }

    /// Batched profile lookup. Unknown ids are silently omitted.
    pub fn lookup_many(&self, ids: &[UserId]) -> Vec<UserProfile> {
        let state = self.state.read();
        ids.iter().filter_map(|id| state.users.get(id).map(|r| r.profile.clone())).collect()
    }

    fn issue_token(&self, state: &mut DirectoryState, user_id: UserId) -> AuthToken {
        // 256-bit random token, hex-encoded. Opaque to clients.
        let token = format!("{:032x}{:032x}", self.env.random_u128(), self.env.random_u128());
        state.tokens.insert(token.clone(), user_id);
        AuthToken(token)
    }
}

impl<E: Environment> std::fmt::Debug for UserDirectory<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory").field("user_count", &self.state.read().users.len()).finish()
    }
}
