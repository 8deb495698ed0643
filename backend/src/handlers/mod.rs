//! HTTP request handlers for the portal API.
//!
//! Handlers are grouped by area. Portal routes run behind the gate
//! middleware and read the [`Tenant`](crate::gate::Tenant) it attaches;
//! gate, theme and super-admin routes do not.

pub mod content;
pub mod directory;
pub mod notices;
pub mod portal;
pub mod settings;
pub mod super_admin;

use crate::auth::{AuthError, SessionStore};
use crate::config::{Config, StorageKind};
use crate::gate::Gate;
use crate::kv::{FileBackend, KvBackend, KvError, MemoryBackend};
use crate::local_state::LocalState;
use crate::media::MediaError;
use crate::models::{ErrorResponse, HealthResponse};
use crate::store::Store;
use axum::{http::StatusCode, response::IntoResponse, Json};
use portal_core::license::ActivationError;
use portal_core::Screen;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Unscoped store over the whole namespace
    pub store: Store,
    pub sessions: Arc<SessionStore>,
    pub gate: Arc<Gate>,
    /// Device-local activation code and theme
    pub local: Arc<LocalState>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn KvBackend>, local: LocalState) -> Self {
        let store = Store::new(backend);
        let local = Arc::new(local);
        let gate = Arc::new(Gate::new(store.clone(), local.clone(), config.tenancy));
        let sessions = Arc::new(SessionStore::new(
            config.session_ttl,
            config.super_admin_session_ttl,
        ));
        Self {
            config: Arc::new(config),
            store,
            sessions,
            gate,
            local,
        }
    }

    /// Open the configured storage backend and local state.
    pub async fn from_config(config: Config) -> Result<Self, KvError> {
        match config.storage {
            StorageKind::Memory => Ok(Self::new(
                config,
                Arc::new(MemoryBackend::new()),
                LocalState::in_memory(),
            )),
            StorageKind::File => {
                let backend = FileBackend::open(&config.data_dir)?;
                let local = LocalState::load(config.local_state_path()).await;
                Ok(Self::new(config, Arc::new(backend), local))
            }
        }
    }
}

// === Health Check ===

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// === Shared helpers ===

/// `<collection>/<id>`, refusing IDs that would address another path.
pub(crate) fn child_path(collection: &str, id: &str) -> Result<String, ApiError> {
    if id.is_empty() || id.contains('/') {
        return Err(ApiError::NotFound("Record not found"));
    }
    Ok(format!("{collection}/{id}"))
}

/// Turn a store write result into an error the client sees.
pub(crate) fn ensure_written(ok: bool) -> Result<(), ApiError> {
    if ok {
        Ok(())
    } else {
        Err(ApiError::StoreFailure)
    }
}

pub(crate) fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

// === Error Handling ===

#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    NotFound(&'static str),
    InvalidCredentials(&'static str),
    /// Admin credential was missing and has just been seeded
    AdminInitialized,
    ContentLocked,
    DownloadDisabled,
    ConfirmationRequired(&'static str),
    PayloadTooLarge(String),
    ActivationRequired,
    ActivationFailed(ActivationError),
    GateClosed {
        code: &'static str,
        screen: Screen,
    },
    StoreFailure,
    Internal,
    Auth(AuthError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<portal_core::Error> for ApiError {
    fn from(err: portal_core::Error) -> Self {
        match err {
            portal_core::Error::PayloadTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            portal_core::Error::UnknownContentKind { .. } => {
                ApiError::NotFound("Unknown content collection")
            }
            other => ApiError::InvalidInput(other.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            MediaError::Empty | MediaError::InvalidDataUri => ApiError::InvalidInput(err.to_string()),
            MediaError::Io(_) => ApiError::InvalidInput("failed to read upload".to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message, screen) = match self {
            ApiError::Auth(auth_err) => return auth_err.into_response(),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.to_string(), None),
            ApiError::InvalidCredentials(msg) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                msg.to_string(),
                None,
            ),
            ApiError::AdminInitialized => (
                StatusCode::UNAUTHORIZED,
                "ADMIN_INITIALIZED",
                format!(
                    "Admin initialized. Try: {} / {}",
                    portal_core::student::DEFAULT_ADMIN_EMAIL,
                    portal_core::student::DEFAULT_ADMIN_PASSWORD
                ),
                None,
            ),
            ApiError::ContentLocked => (
                StatusCode::FORBIDDEN,
                "CONTENT_LOCKED",
                "Upgrade to paid to access this content".to_string(),
                None,
            ),
            ApiError::DownloadDisabled => (
                StatusCode::FORBIDDEN,
                "DOWNLOAD_DISABLED",
                "Download is not available for this item".to_string(),
                None,
            ),
            ApiError::ConfirmationRequired(msg) => (
                StatusCode::BAD_REQUEST,
                "CONFIRMATION_REQUIRED",
                msg.to_string(),
                None,
            ),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg, None)
            }
            ApiError::ActivationRequired => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ACTIVATION_REQUIRED",
                "Enter your license code to activate this portal".to_string(),
                None,
            ),
            ApiError::ActivationFailed(reason) => (
                StatusCode::BAD_REQUEST,
                "ACTIVATION_FAILED",
                reason.message().to_string(),
                None,
            ),
            ApiError::GateClosed { code, screen } => (
                StatusCode::SERVICE_UNAVAILABLE,
                code,
                screen.message.clone(),
                Some(screen),
            ),
            ApiError::StoreFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_FAILURE",
                "Failed to save. Please try again.".to_string(),
                None,
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "internal server error".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            code,
            screen,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn gate_closed_carries_screen() {
        let (status, body) = body_of(ApiError::GateClosed {
            code: "LICENSE_EXPIRED",
            screen: Screen {
                title: "License Expired".into(),
                message: "Renew".into(),
            },
        })
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "LICENSE_EXPIRED");
        assert_eq!(body["screen"]["title"], "License Expired");
    }

    #[tokio::test]
    async fn core_errors_map_to_codes() {
        let (status, body) = body_of(portal_core::Error::MissingFile.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");

        let (status, _) = body_of(
            portal_core::Error::PayloadTooLarge { size: 10, max: 5 }.into(),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn child_path_rejects_nested_ids() {
        assert_eq!(child_path("notes", "n1").unwrap(), "notes/n1");
        assert!(child_path("notes", "a/b").is_err());
        assert!(child_path("notes", "").is_err());
    }
}
