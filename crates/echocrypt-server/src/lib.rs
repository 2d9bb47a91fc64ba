//! EchoCrypt relay server.
//!
//! The server stores and relays ciphertext plus metadata: it never sees
//! plaintext and never holds a room key. Core pieces:
//!
//! ```text
//! echocrypt-server
//!   ├─ RoomStore       (append-only ciphertext log + membership per room)
//!   ├─ UserDirectory   (argon2 credentials, bearer tokens, profiles)
//!   └─ http::router    (axum surface: /api/register .. /api/rooms/..)
//! ```
//!
//! Runs on `SystemEnv` in production; tests inject deterministic
//! environments.

pub mod directory;
pub mod error;
pub mod http;
pub mod store;

use std::sync::Arc;

use echocrypt_core::{Environment, SystemEnv};

pub use directory::{AuthError, AuthToken, UserDirectory};
pub use error::ApiError;
pub use http::{AppState, router};
pub use store::{RoomStore, StoreError};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub bind_address: String,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:8080".to_string() }
    }
}

/// Production EchoCrypt server: store + directory behind the HTTP router.
pub struct Server {
    listener: tokio::net::TcpListener,
    app: axum::Router,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn bind(config: ServerRuntimeConfig) -> std::io::Result<Self> {
        let env = SystemEnv::new();
        let state = AppState {
            store: Arc::new(RoomStore::new(env.clone())),
            directory: Arc::new(UserDirectory::new(env)),
        };

        let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
        Ok(Self { listener, app: router(state) })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the server until shut down or a fatal accept error occurs.
    pub async fn run(self) -> std::io::Result<()> {
        tracing::info!("server listening on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.app).await
    }
}

/// Build an in-process state for tests and embedded use.
pub fn app_state<E: Environment>(env: E) -> AppState<E> {
    AppState {
        store: Arc::new(RoomStore::new(env.clone())),
        directory: Arc::new(UserDirectory::new(env)),
    }
}
