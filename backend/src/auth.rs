//! Session management for portal users.
//!
//! Login hands the client an opaque bearer token. The server keeps only
//! SHA-256(token) mapped to the session, so a leaked session table cannot
//! be replayed.
//!
//! # Lifetimes
//!
//! - Student and admin sessions: 24 hours from login
//! - Super-admin sessions: 4 hours from login
//!
//! Expiry is checked on every lookup; a background sweep drops sessions
//! nobody asks for again.
//!
//! # Roles
//!
//! Handlers take one of the extractors ([`AdminSession`],
//! [`StudentSession`], [`SuperAdminSession`]) to require a role. Student and
//! admin sessions are bound to the tenant that was active at login.

use crate::gate::Tenant;
use crate::handlers::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use portal_core::Access;
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Who a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    Student,
    SuperAdmin,
}

/// Signed-in identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionUser {
    /// Tenant admin
    Admin { email: String },
    /// Student, with the paid status in effect for this session
    Student {
        id: String,
        name: String,
        email: String,
        status: Access,
    },
    /// Operator above all tenants
    SuperAdmin,
}

impl SessionUser {
    pub fn role(&self) -> Role {
        match self {
            SessionUser::Admin { .. } => Role::Admin,
            SessionUser::Student { .. } => Role::Student,
            SessionUser::SuperAdmin => Role::SuperAdmin,
        }
    }
}

/// A live session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: SessionUser,
    /// Login time
    pub timestamp: DateTime<Utc>,
    /// License code active at login (multi-tenant only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl Session {
    pub fn role(&self) -> Role {
        self.user.role()
    }
}

/// Thread-safe session table keyed by token hash
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
    super_admin_ttl: Duration,
}

impl SessionStore {
    /// Create an empty session store
    pub fn new(ttl: Duration, super_admin_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
            super_admin_ttl,
        }
    }

    /// Number of stored sessions, expired ones included until swept
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Start a session. Returns the bearer token and the stored session.
    pub fn save_session(&self, user: SessionUser, tenant: Option<String>) -> (String, Session) {
        let token = new_token();
        let session = Session {
            user,
            timestamp: Utc::now(),
            tenant,
        };
        self.sessions.insert(hash_token(&token), session.clone());
        debug!(role = ?session.role(), "Session started");
        (token, session)
    }

    /// The session for `token`, if it exists and has not expired.
    /// Expired sessions are removed on sight.
    pub fn get_session(&self, token: &str) -> Option<Session> {
        let key = hash_token(token);
        let session = self.sessions.get(&key)?.value().clone();
        if self.is_expired(&session, Utc::now()) {
            self.sessions.remove(&key);
            return None;
        }
        Some(session)
    }

    /// End a session. Returns whether one existed.
    pub fn clear_session(&self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    fn ttl_for(&self, role: Role) -> Duration {
        match role {
            Role::SuperAdmin => self.super_admin_ttl,
            Role::Admin | Role::Student => self.ttl,
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        chrono::Duration::from_std(self.ttl_for(session.role()))
            .map(|ttl| now.signed_duration_since(session.timestamp) >= ttl)
            .unwrap_or(false)
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !self.is_expired(s, now));
        before.saturating_sub(self.sessions.len())
    }

    /// Start background sweep of expired sessions
    pub fn start_cleanup_task(self: Arc<Self>, interval: Duration) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    debug!(removed, "Swept expired sessions");
                }
            }
        });

        info!(
            interval_secs = interval.as_secs(),
            "Started session cleanup task"
        );
    }

    #[cfg(test)]
    fn backdate(&self, token: &str, by: chrono::Duration) {
        if let Some(mut entry) = self.sessions.get_mut(&hash_token(token)) {
            entry.timestamp -= by;
        }
    }
}

/// 32 random bytes, hex-encoded
fn new_token() -> String {
    let mut bytes = [0u8; 32];
    if SystemRandom::new().fill(&mut bytes).is_err() {
        return format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    }
    hex::encode(bytes)
}

/// Hash a token using SHA-256 and return hex-encoded result
pub fn hash_token(token: &str) -> String {
    let hash = digest(&SHA256, token.as_bytes());
    hex::encode(hash.as_ref())
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    authorization
        .strip_prefix("Bearer ")
        .or_else(|| authorization.strip_prefix("bearer "))
}

/// Authorization error
#[derive(Debug)]
pub enum AuthError {
    /// Missing Authorization header
    MissingHeader,
    /// Invalid Authorization header format
    InvalidHeader,
    /// No live session for the token
    Unauthorized,
    /// Session role may not use this endpoint
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "MISSING_AUTH",
                "Authorization header required",
            ),
            AuthError::InvalidHeader => (
                StatusCode::BAD_REQUEST,
                "INVALID_AUTH",
                "Invalid Authorization header format",
            ),
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Session expired. Please log in again.",
            ),
            AuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Not available for this account",
            ),
        };

        let body = Json(AuthErrorResponse {
            error: message.to_string(),
            code,
        });

        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct AuthErrorResponse {
    error: String,
    code: &'static str,
}

// === Extractors ===

/// Any live session, with the token that opened it
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub token: String,
    pub session: Session,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidHeader)?;
        let token = extract_bearer_token(header)
            .ok_or(AuthError::InvalidHeader)?
            .to_string();

        let session = state
            .sessions
            .get_session(&token)
            .ok_or(AuthError::Unauthorized)?;

        // A session opened under one license is void under another.
        if session.role() != Role::SuperAdmin {
            if let Some(tenant) = parts.extensions.get::<Tenant>() {
                if tenant.license_code != session.tenant {
                    return Err(AuthError::Unauthorized);
                }
            }
        }

        Ok(Self { token, session })
    }
}

/// Tenant admin session
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub email: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Authenticated::from_request_parts(parts, state).await?.session.user {
            SessionUser::Admin { email } => Ok(Self { email }),
            _ => Err(AuthError::Forbidden),
        }
    }
}

/// Student session
#[derive(Debug, Clone)]
pub struct StudentSession {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Effective status fixed at login
    pub status: Access,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for StudentSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Authenticated::from_request_parts(parts, state).await?.session.user {
            SessionUser::Student {
                id,
                name,
                email,
                status,
            } => Ok(Self {
                id,
                name,
                email,
                status,
            }),
            _ => Err(AuthError::Forbidden),
        }
    }
}

/// Super-admin session
#[derive(Debug, Clone)]
pub struct SuperAdminSession {
    pub token: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for SuperAdminSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = Authenticated::from_request_parts(parts, state).await?;
        match auth.session.user {
            SessionUser::SuperAdmin => Ok(Self { token: auth.token }),
            _ => Err(AuthError::Forbidden),
        }
    }
}
