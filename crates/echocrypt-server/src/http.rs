//! HTTP surface over the store and directory.
//!
//! Every response uses the `{success, data?, error?}` envelope. Ciphertext
//! crosses this boundary base64-encoded; in memory it is raw bytes.
//!
//! The bearer token only asserts identity at the transport level; nothing
//! here is cryptographically bound to message contents.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use echocrypt_core::{EncryptedMessage, Environment, Room, RoomId, UserId, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::directory::UserDirectory;
use crate::error::ApiError;
use crate::store::RoomStore;

/// Shared handler state.
pub struct AppState<E: Environment> {
    /// Ciphertext log + membership.
    pub store: Arc<RoomStore<E>>,
    /// Users, credentials, tokens.
    pub directory: Arc<UserDirectory<E>>,
}

impl<E: Environment> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), directory: Arc::clone(&self.directory) }
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn ok<T>(data: T) -> Json<ApiEnvelope<T>> {
    Json(ApiEnvelope { success: true, data: Some(data), error: None })
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl<E: Environment> FromRequestParts<AppState<E>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<E>,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = value.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;
        let user_id = state.directory.resolve_token(token).ok_or(ApiError::Unauthorized)?;

        Ok(Self(user_id))
    }
}

/// Username/password credentials for register and login.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    /// Unique login handle, 3-20 characters.
    pub username: String,
    /// At least 6 characters.
    pub password: String,
}

/// Successful auth payload.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The authenticated profile.
    pub user: UserProfile,
    /// Opaque bearer token for subsequent requests.
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    /// Base64-encoded `nonce || AEAD(...)` bytes.
    ciphertext: String,
}

#[derive(Debug, Deserialize)]
struct UsersQuery {
    /// Comma-separated user ids.
    ids: String,
}

fn validate_credentials(req: &AuthRequest) -> Result<(), ApiError> {
    let name_len = req.username.chars().count();
    if !(3..=20).contains(&name_len) {
        return Err(ApiError::Validation("username must be 3-20 characters".to_string()));
    }
    if req.password.chars().count() < 6 {
        return Err(ApiError::Validation("password must be at least 6 characters".to_string()));
    }
    Ok(())
}

async fn register<E: Environment>(
    State(state): State<AppState<E>>,
    Json(req): Json<AuthRequest>,
) -> Result<Json<ApiEnvelope<AuthResponse>>, ApiError> {
    validate_credentials(&req)?;
    let (user, token) = state.directory.register(&req.username, &req.password)?;
    Ok(ok(AuthResponse { user, token: token.0 }))
}

async fn login<E: Environment>(
    State(state): State<AppState<E>>,
    Json(req): Json<AuthRequest>,
) -> Result<Json<ApiEnvelope<AuthResponse>>, ApiError> {
    validate_credentials(&req)?;
    let (user, token) = state.directory.login(&req.username, &req.password)?;
    Ok(ok(AuthResponse { user, token: token.0 }))
}

async fn get_users<E: Environment>(
    State(state): State<AppState<E>>,
    _auth: AuthUser,
    Query(query): Query<UsersQuery>,
) -> Result<Json<ApiEnvelope<Vec<UserProfile>>>, ApiError> {
    let ids = query
        .ids
        .split(',')
        .filter(|s| !s.is_empty())
        .map(Uuid::parse_str)
        .collect::<Result<Vec<UserId>, _>>()
        .map_err(|_| ApiError::Validation("malformed user id".to_string()))?;

    if ids.is_empty() {
        return Err(ApiError::Validation("user ids are required".to_string()));
    }

    Ok(ok(state.directory.lookup_many(&ids)))
}

async fn create_room<E: Environment>(
    State(state): State<AppState<E>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<ApiEnvelope<Room>>, ApiError> {
    let name = req.name.trim();
    let name_len = name.chars().count();
    if !(3..=30).contains(&name_len) {
        return Err(ApiError::Validation("room name must be 3-30 characters".to_string()));
    }

    Ok(ok(state.store.create_room(name, user_id)))
}

async fn list_rooms<E: Environment>(
    State(state): State<AppState<E>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiEnvelope<Vec<Room>>>, ApiError> {
    Ok(ok(state.store.rooms_for_user(user_id)))
}

async fn join_room<E: Environment>(
    State(state): State<AppState<E>>,
    AuthUser(user_id): AuthUser,
    Path(room_id): Path<RoomId>,
) -> Result<Json<ApiEnvelope<Room>>, ApiError> {
    Ok(ok(state.store.join(room_id, user_id)?))
}

async fn list_messages<E: Environment>(
    State(state): State<AppState<E>>,
    AuthUser(user_id): AuthUser,
    Path(room_id): Path<RoomId>,
) -> Result<Json<ApiEnvelope<Vec<EncryptedMessage>>>, ApiError> {
    Ok(ok(state.store.list_messages(room_id, user_id)?))
}

async fn send_message<E: Environment>(
    State(state): State<AppState<E>>,
    AuthUser(user_id): AuthUser,
    Path(room_id): Path<RoomId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiEnvelope<EncryptedMessage>>, ApiError> {
    if req.ciphertext.is_empty() {
        return Err(ApiError::Validation("ciphertext is required".to_string()));
    }

    let ciphertext = STANDARD
        .decode(&req.ciphertext)
        .map_err(|_| ApiError::Validation("ciphertext is not valid base64".to_string()))?;

    Ok(ok(state.store.append_message(room_id, user_id, ciphertext)?))
}

/// Build the application router.
pub fn router<E: Environment>(state: AppState<E>) -> Router {
    Router::new()
        .route("/api/register", post(register::<E>))
        .route("/api/login", post(login::<E>))
        .route("/api/users", get(get_users::<E>))
        .route("/api/rooms", post(create_room::<E>).get(list_rooms::<E>))
        .route("/api/rooms/:room_id/join", post(join_room::<E>))
        .route("/api/rooms/:room_id/messages", get(list_messages::<E>).post(send_message::<E>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
