//! Branding, backup/restore, reset and uploads.

use super::{attachment, ensure_written, ApiError, AppState};
use crate::auth::AdminSession;
use crate::gate::Tenant;
use crate::media::{self, UploadKind};
use crate::models::{
    BrandingResponse, ImportRequest, ImportResponse, LogoRequest, ResetRequest, SuccessResponse,
    UploadQuery, UploadResponse,
};
use crate::store::Store;
use axum::{
    extract::{Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap,
    },
    response::IntoResponse,
    Extension, Json,
};
use bytes::Bytes;
use chrono::Utc;
use portal_core::backup::{backup_filename, BACKUP_PATHS, RESET_PATHS};
use portal_core::{BackupDocument, BrandingSettings};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Stored branding with defaults filled in.
pub(crate) async fn load_branding(store: &Store) -> BrandingSettings {
    store
        .get_as::<BrandingSettings>("branding")
        .await
        .unwrap_or_default()
        .with_defaults()
}

// === Branding ===

/// GET /v1/branding - Public branding and the teacher info bar
pub async fn get_branding(Extension(tenant): Extension<Tenant>) -> Json<BrandingResponse> {
    let settings = load_branding(&tenant.store).await;
    let teacher_info = settings.teacher_info();
    Json(BrandingResponse {
        settings,
        teacher_info,
    })
}

/// PUT /v1/admin/branding - Save settings; the logo is managed separately
pub async fn update_branding(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Json(mut settings): Json<BrandingSettings>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let existing = load_branding(&tenant.store).await;
    settings.retain_logo(&existing);
    ensure_written(tenant.store.set_as("branding", &settings).await)?;
    info!("Branding updated");
    Ok(Json(SuccessResponse::ok()))
}

/// PUT /v1/admin/branding/logo
pub async fn set_logo(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Json(req): Json<LogoRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if req.logo.is_empty() {
        return Err(ApiError::InvalidInput("logo is required".to_string()));
    }
    let mut fields = Map::new();
    fields.insert("logo".to_string(), Value::String(req.logo));
    ensure_written(tenant.store.update("branding", fields).await)?;
    info!("Logo updated");
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /v1/admin/branding/logo
pub async fn clear_logo(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
) -> Result<Json<SuccessResponse>, ApiError> {
    let mut fields = Map::new();
    fields.insert("logo".to_string(), Value::String(String::new()));
    ensure_written(tenant.store.update("branding", fields).await)?;
    info!("Logo removed");
    Ok(Json(SuccessResponse::ok()))
}

// === Backup ===

/// GET /v1/admin/backup - Download every collection as one document
pub async fn export_backup(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
) -> impl IntoResponse {
    let now = Utc::now();
    let mut document = BackupDocument::default();
    for path in BACKUP_PATHS {
        document.insert(path, tenant.store.get(path).await);
    }
    info!("Backup exported");
    (
        [(CONTENT_DISPOSITION, attachment(&backup_filename(now)))],
        Json(document.stamped(now)),
    )
}

/// POST /v1/admin/backup/import - Overwrite every key the document holds
pub async fn import_backup(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ApiError> {
    if !req.confirm {
        return Err(ApiError::ConfirmationRequired(
            "Importing will overwrite existing data. Repeat with confirm: true.",
        ));
    }
    if !req.document.is_object() {
        return Err(ApiError::InvalidInput("Invalid backup file".to_string()));
    }
    let document: BackupDocument = serde_json::from_value(req.document)?;

    let mut restored = Vec::new();
    for (path, value) in document.entries() {
        if tenant.store.set(path, value.clone()).await {
            restored.push(path);
        } else {
            warn!(path, "Backup key failed to restore");
        }
    }

    info!(keys = restored.len(), "Backup imported");
    Ok(Json(ImportResponse { restored }))
}

/// POST /v1/admin/reset - Delete students and all content
pub async fn reset(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Json(req): Json<ResetRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !(req.confirm && req.confirm_again) {
        return Err(ApiError::ConfirmationRequired(
            "This will delete all students and content. Confirm twice to continue.",
        ));
    }

    let mut ok = true;
    for path in RESET_PATHS {
        ok &= tenant.store.delete(path).await;
    }
    ensure_written(ok)?;

    info!("Tenant data reset");
    Ok(Json(SuccessResponse::ok()))
}

// === Uploads ===

/// POST /v1/admin/uploads?kind=document|image|video - Encode a file
pub async fn upload(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let mime = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim())
        .filter(|v| !v.is_empty() && *v != "application/octet-stream")
        .unwrap_or(query.kind.default_mime())
        .to_string();

    let limit = match query.kind {
        UploadKind::Video => state.config.video_upload_limit,
        UploadKind::Document | UploadKind::Image => state.config.max_upload_bytes,
    };

    let size = body.len();
    let data_uri = media::read_to_data_uri(&body[..], &mime, limit).await?;
    info!(kind = ?query.kind, size, "Upload encoded");
    Ok(Json(UploadResponse { data_uri, size }))
}
