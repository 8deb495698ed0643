//! Super-admin surface: global restrictions, licenses, tenant notices,
//! statistics and whole-namespace export, import and reset.
//!
//! These routes sit outside the gate so a closed or unactivated portal can
//! still be administered.

use super::{attachment, child_path, directory::collect_overview, ensure_written, ApiError, AppState};
use crate::auth::{SessionUser, SuperAdminSession};
use crate::gate::{global_restrictions_path, load_license};
use crate::models::{
    ConfirmQuery, CreatedResponse, LicenseCreateRequest, LicenseScopeQuery, LicenseUpdateRequest,
    LicenseView, LoginResponse, NoticeToggleRequest, SiteStatusRequest, Statistics,
    SuccessResponse, SuperAdminCredentials, SuperCredentialsRequest, SuperImportRequest,
    SuperLoginRequest, SuperNoticeView, SuperResetRequest, TenantNoticeView,
};
use crate::store::Store;
use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_DISPOSITION, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use portal_core::backup::full_backup_filename;
use portal_core::license::{
    license_path, normalize_code, tenant_data_prefix, tenant_notices_path, TenantNotice,
    SUPER_ADMIN_ROOT,
};
use portal_core::{calendar, AdminCredential, License, Notice, Restrictions};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

const RESET_CONFIRMATION: &str = "DELETE ALL";

fn credentials_path() -> String {
    format!("{SUPER_ADMIN_ROOT}/credentials")
}

fn licenses_path() -> String {
    format!("{SUPER_ADMIN_ROOT}/licenses")
}

/// Seed super-admin credentials and global restrictions if missing.
pub async fn seed_defaults(store: &Store) {
    if store.get(&credentials_path()).await.is_none() {
        store
            .set_as(&credentials_path(), &SuperAdminCredentials::default())
            .await;
        info!("Seeded default super-admin credentials");
    }
    if store.get(&global_restrictions_path()).await.is_none() {
        store
            .set_as(&global_restrictions_path(), &Restrictions::default())
            .await;
        info!("Seeded default global restrictions");
    }
}

async fn load_credentials(store: &Store) -> SuperAdminCredentials {
    match store.get_as::<SuperAdminCredentials>(&credentials_path()).await {
        Some(creds) => creds,
        None => {
            seed_defaults(store).await;
            SuperAdminCredentials::default()
        }
    }
}

/// A license code from a path or query, checked to exist.
async fn existing_license(store: &Store, raw: &str) -> Result<(String, License), ApiError> {
    let code = normalize_code(raw);
    child_path(&licenses_path(), &code)?;
    let license = load_license(store, &code)
        .await
        .ok_or(ApiError::NotFound("License not found"))?;
    Ok((code, license))
}

/// Where restrictions for a scope live: one license, or global.
async fn restrictions_path(store: &Store, scope: &LicenseScopeQuery) -> Result<String, ApiError> {
    match &scope.license {
        Some(raw) => {
            let (code, _) = existing_license(store, raw).await?;
            Ok(format!("{}/restrictions", license_path(&code)))
        }
        None => Ok(global_restrictions_path()),
    }
}

/// Store holding a scope's tenant data.
async fn data_store(store: &Store, scope: &LicenseScopeQuery) -> Result<(Store, Option<String>), ApiError> {
    match &scope.license {
        Some(raw) => {
            let (code, _) = existing_license(store, raw).await?;
            Ok((store.scoped(&tenant_data_prefix(&code)), Some(code)))
        }
        None => Ok((store.clone(), None)),
    }
}

// === Session ===

/// POST /v1/super/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<SuperLoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let creds = load_credentials(&state.store).await;
    if !creds.matches(req.access_key.trim(), &req.security_code) {
        warn!("Super-admin login rejected");
        return Err(ApiError::InvalidCredentials(
            "Invalid credentials. Access denied.",
        ));
    }

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    state
        .store
        .set(&format!("{SUPER_ADMIN_ROOT}/lastLogin"), Value::String(now))
        .await;

    let (token, session) = state.sessions.save_session(SessionUser::SuperAdmin, None);
    info!("Super admin logged in");
    Ok(Json(LoginResponse { token, session }))
}

/// POST /v1/super/logout
pub async fn logout(
    State(state): State<AppState>,
    auth: SuperAdminSession,
) -> Json<SuccessResponse> {
    state.sessions.clear_session(&auth.token);
    Json(SuccessResponse::ok())
}

/// PUT /v1/super/credentials - Requires the current pair
pub async fn update_credentials(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Json(req): Json<SuperCredentialsRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let creds = load_credentials(&state.store).await;
    if !creds.matches(req.current_key.trim(), &req.current_code) {
        warn!("Super-admin credential change rejected");
        return Err(ApiError::InvalidCredentials("Current credentials are incorrect"));
    }
    let new_key = req.new_key.trim();
    if new_key.is_empty() || req.new_code.is_empty() {
        return Err(ApiError::InvalidInput(
            "new access key and security code are required".to_string(),
        ));
    }

    let updated = SuperAdminCredentials {
        access_key: new_key.to_string(),
        security_code: req.new_code,
    };
    ensure_written(state.store.set_as(&credentials_path(), &updated).await)?;
    info!("Super-admin credentials changed");
    Ok(Json(SuccessResponse::ok()))
}

// === Restrictions ===

/// GET /v1/super/restrictions[?license=CODE]
pub async fn get_restrictions(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Query(scope): Query<LicenseScopeQuery>,
) -> Result<Json<Restrictions>, ApiError> {
    let path = restrictions_path(&state.store, &scope).await?;
    Ok(Json(
        state
            .store
            .get_as::<Restrictions>(&path)
            .await
            .unwrap_or_default(),
    ))
}

/// PUT /v1/super/restrictions[?license=CODE] - Replace feature and site
/// settings; per-notice overrides are kept when none are sent
pub async fn save_restrictions(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Query(scope): Query<LicenseScopeQuery>,
    Json(mut restrictions): Json<Restrictions>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let path = restrictions_path(&state.store, &scope).await?;
    if restrictions.notice_restrictions.is_empty() {
        if let Some(existing) = state.store.get_as::<Restrictions>(&path).await {
            restrictions.notice_restrictions = existing.notice_restrictions;
        }
    }
    ensure_written(state.store.set_as(&path, &restrictions).await)?;
    info!(license = ?scope.license, "Restrictions saved");
    Ok(Json(SuccessResponse::ok()))
}

/// PUT /v1/super/site-status[?license=CODE] - Site switch and maintenance screen
pub async fn set_site_status(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Query(scope): Query<LicenseScopeQuery>,
    Json(req): Json<SiteStatusRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let path = restrictions_path(&state.store, &scope).await?;
    let mut fields = Map::new();
    fields.insert("siteEnabled".to_string(), Value::Bool(req.site_enabled));
    if let Some(title) = req.maintenance_title {
        fields.insert("maintenanceTitle".to_string(), Value::String(title));
    }
    if let Some(message) = req.maintenance_message {
        fields.insert("maintenanceMessage".to_string(), Value::String(message));
    }
    ensure_written(state.store.update(&path, fields).await)?;
    info!(license = ?scope.license, enabled = req.site_enabled, "Site status changed");
    Ok(Json(SuccessResponse::ok()))
}

/// GET /v1/super/notices[?license=CODE] - A tenant's notices with their overrides
pub async fn list_notices(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Query(scope): Query<LicenseScopeQuery>,
) -> Result<Json<Vec<SuperNoticeView>>, ApiError> {
    let (store, _) = data_store(&state.store, &scope).await?;
    let path = restrictions_path(&state.store, &scope).await?;
    let overrides: BTreeMap<String, bool> = state
        .store
        .get_as::<Restrictions>(&path)
        .await
        .map(|r| r.notice_restrictions)
        .unwrap_or_default();

    let notices = store
        .collection_as::<Notice>("notices")
        .await
        .into_iter()
        .map(|r| SuperNoticeView {
            enabled: overrides.get(&r.id) != Some(&false),
            id: r.id,
            notice: r.item,
        })
        .collect();
    Ok(Json(notices))
}

/// PUT /v1/super/notices/:id[?license=CODE] - Per-notice override
pub async fn toggle_notice(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Path(id): Path<String>,
    Query(scope): Query<LicenseScopeQuery>,
    Json(req): Json<NoticeToggleRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let restrictions = restrictions_path(&state.store, &scope).await?;
    let path = child_path(&format!("{restrictions}/noticeRestrictions"), &id)?;
    ensure_written(state.store.set(&path, Value::Bool(req.enabled)).await)?;
    info!(notice = %id, enabled = req.enabled, "Notice override set");
    Ok(Json(SuccessResponse::ok()))
}

// === Licenses ===

fn license_view(code: String, license: License, has_data: bool) -> LicenseView {
    LicenseView {
        expired: license.is_expired(Utc::now()),
        has_data,
        code,
        license,
    }
}

/// GET /v1/super/licenses
pub async fn list_licenses(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
) -> Json<Vec<LicenseView>> {
    let Some(Value::Object(all)) = state.store.get(&licenses_path()).await else {
        return Json(Vec::new());
    };
    let licenses = all
        .into_iter()
        .filter_map(|(code, raw)| {
            let has_data = raw.get("data").is_some_and(|d| !d.is_null());
            match serde_json::from_value::<License>(raw) {
                Ok(license) => Some(license_view(code, license, has_data)),
                Err(e) => {
                    warn!(license = %code, error = %e, "Skipping malformed license");
                    None
                }
            }
        })
        .collect();
    Json(licenses)
}

/// GET /v1/super/licenses/:code
pub async fn get_license(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Path(code): Path<String>,
) -> Result<Json<LicenseView>, ApiError> {
    let (code, license) = existing_license(&state.store, &code).await?;
    let has_data = state.store.contains(&tenant_data_prefix(&code)).await;
    Ok(Json(license_view(code, license, has_data)))
}

/// POST /v1/super/licenses
pub async fn create_license(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Json(req): Json<LicenseCreateRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let code = normalize_code(&req.code);
    if code.is_empty()
        || !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::InvalidInput(
            "license code may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    if let Some(expiry) = &req.license.expiry {
        calendar::parse_date(expiry)?;
    }

    let path = license_path(&code);
    if state.store.contains(&path).await {
        return Err(ApiError::InvalidInput("License already exists".to_string()));
    }
    ensure_written(state.store.set_as(&path, &req.license).await)?;

    info!(license = %code, "License created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: code })))
}

/// PUT /v1/super/licenses/:code - Partial edit; tenant data is untouched
pub async fn update_license(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Path(code): Path<String>,
    Json(req): Json<LicenseUpdateRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let (code, existing) = existing_license(&state.store, &code).await?;

    let mut fields = Map::new();
    if let Some(name) = req.name {
        fields.insert("name".to_string(), Value::String(name));
    }
    if let Some(status) = req.status {
        fields.insert("status".to_string(), serde_json::to_value(status)?);
    }
    if let Some(expiry) = req.expiry {
        let expiry = expiry.trim().to_string();
        if expiry.is_empty() {
            fields.insert("expiry".to_string(), Value::Null);
        } else {
            calendar::parse_date(&expiry)?;
            fields.insert("expiry".to_string(), Value::String(expiry));
        }
    }
    if let Some(mut restrictions) = req.restrictions {
        if restrictions.notice_restrictions.is_empty() {
            restrictions.notice_restrictions = existing.restrictions.notice_restrictions;
        }
        fields.insert("restrictions".to_string(), serde_json::to_value(restrictions)?);
    }
    if fields.is_empty() {
        return Err(ApiError::InvalidInput("nothing to update".to_string()));
    }

    ensure_written(state.store.update(&license_path(&code), fields).await)?;
    info!(license = %code, "License updated");
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /v1/super/licenses/:code?confirm=true - Removes the tenant's data too
pub async fn delete_license(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Path(code): Path<String>,
    Query(confirm): Query<ConfirmQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !confirm.confirm {
        return Err(ApiError::ConfirmationRequired(
            "Deleting a license removes all of its data. Repeat with confirm=true.",
        ));
    }
    let (code, _) = existing_license(&state.store, &code).await?;
    ensure_written(state.store.delete(&license_path(&code)).await)?;
    info!(license = %code, "License deleted");
    Ok(Json(SuccessResponse::ok()))
}

// === Tenant notices ===

/// GET /v1/super/licenses/:code/notices - Everything sent, read or not
pub async fn list_tenant_notices(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Path(code): Path<String>,
) -> Result<Json<Vec<TenantNoticeView>>, ApiError> {
    let (code, _) = existing_license(&state.store, &code).await?;
    let mut notices: Vec<TenantNoticeView> = state
        .store
        .collection_as::<TenantNotice>(&tenant_notices_path(&code))
        .await
        .into_iter()
        .map(|r| TenantNoticeView {
            id: r.id,
            notice: r.item,
        })
        .collect();
    notices.sort_by(|a, b| b.notice.created_at.cmp(&a.notice.created_at));
    Ok(Json(notices))
}

/// POST /v1/super/licenses/:code/notices - Message a tenant's admin
pub async fn send_tenant_notice(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Path(code): Path<String>,
    Json(mut notice): Json<TenantNotice>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let (code, _) = existing_license(&state.store, &code).await?;
    if notice.title.trim().is_empty() || notice.message.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "title and message are required".to_string(),
        ));
    }
    notice.read = false;
    notice.created_at = Some(Utc::now().timestamp_millis());

    let id = state
        .store
        .push_as(&tenant_notices_path(&code), &notice)
        .await
        .ok_or(ApiError::StoreFailure)?;
    info!(license = %code, notice = %id, "Tenant notice sent");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// DELETE /v1/super/licenses/:code/notices/:id
pub async fn delete_tenant_notice(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Path((code, id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let (code, _) = existing_license(&state.store, &code).await?;
    let path = child_path(&tenant_notices_path(&code), &id)?;
    if state.store.get(&path).await.is_none() {
        return Err(ApiError::NotFound("Notice not found"));
    }
    ensure_written(state.store.delete(&path).await)?;
    Ok(Json(SuccessResponse::ok()))
}

// === Statistics ===

/// GET /v1/super/statistics[?license=CODE]
pub async fn statistics(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Query(scope): Query<LicenseScopeQuery>,
) -> Result<Json<Statistics>, ApiError> {
    let (store, license) = data_store(&state.store, &scope).await?;
    let overview = collect_overview(&store).await;

    let (licenses, last_login) = if license.is_none() {
        let licenses = state.store.count(&licenses_path()).await;
        let last_login = state
            .store
            .get_as::<String>(&format!("{SUPER_ADMIN_ROOT}/lastLogin"))
            .await;
        (Some(licenses), last_login)
    } else {
        (None, None)
    };

    Ok(Json(Statistics {
        license,
        total_students: overview.total_students,
        paid_students: overview.paid_students,
        notes: overview.notes,
        tutes: overview.tutes,
        videos: overview.videos,
        notices: overview.notices,
        licenses,
        last_login,
    }))
}

// === Whole namespace ===

/// GET /v1/super/export - Every root as one document
pub async fn export_all(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
) -> impl IntoResponse {
    let now = Utc::now();
    let snapshot = state.store.snapshot().await;
    info!("Full export");
    (
        [(CONTENT_DISPOSITION, attachment(&full_backup_filename(now)))],
        Json(snapshot),
    )
}

/// POST /v1/super/import - Replace the entire namespace
pub async fn import_all(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Json(req): Json<SuperImportRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !req.confirm {
        return Err(ApiError::ConfirmationRequired(
            "This replaces ALL data. Repeat with confirm: true.",
        ));
    }
    let roots = req.data.len();
    ensure_written(state.store.replace_all(req.data).await)?;
    info!(roots, "Full import");
    Ok(Json(SuccessResponse::ok()))
}

/// POST /v1/super/reset - Wipe everything except the super-admin credentials
pub async fn reset_all(
    State(state): State<AppState>,
    _auth: SuperAdminSession,
    Json(req): Json<SuperResetRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if req.confirmation != RESET_CONFIRMATION {
        return Err(ApiError::ConfirmationRequired(
            "Type DELETE ALL to confirm a full reset",
        ));
    }

    let creds = load_credentials(&state.store).await;
    let mut data = Map::new();
    data.insert(
        SUPER_ADMIN_ROOT.to_string(),
        json!({
            "credentials": creds,
            "restrictions": Restrictions::default(),
        }),
    );
    data.insert(
        "admin".to_string(),
        serde_json::to_value(AdminCredential::default())?,
    );

    ensure_written(state.store.replace_all(data).await)?;
    warn!("All data reset by super admin");
    Ok(Json(SuccessResponse::ok()))
}
