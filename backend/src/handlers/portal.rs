//! Gate status, activation, theme, dashboards and messages from the
//! super admin.

use super::{child_path, content::accessible, ensure_written, settings::load_branding, ApiError, AppState};
use crate::auth::{AdminSession, AuthError, Authenticated, Role, SessionUser};
use crate::config::Tenancy;
use crate::gate::{GateState, Tenant};
use crate::models::{
    ActivateRequest, ContentStats, DashboardResponse, GateResponse, SuccessResponse, ThemeBody,
    ThemeRequest, TenantNoticeView,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use portal_core::license::{admin_nav, student_nav, tenant_notices_path, TenantNotice};
use portal_core::{Note, Tutorial, Video};
use serde_json::{Map, Value};
use tracing::info;

fn gate_response(tenancy: Tenancy, state: GateState) -> GateResponse {
    let mut response = GateResponse {
        state: state.label(),
        tenancy: tenancy.label(),
        code: None,
        screen: None,
        license_code: None,
    };
    match state {
        GateState::Open(tenant) => response.license_code = tenant.license_code,
        GateState::ActivationRequired => response.code = Some("ACTIVATION_REQUIRED"),
        GateState::Closed { code, screen } => {
            response.code = Some(code);
            response.screen = Some(screen);
        }
    }
    response
}

// === Gate ===

/// GET /v1/gate - Whether the portal may run, and if not which screen to show
pub async fn gate_status(State(state): State<AppState>) -> Json<GateResponse> {
    let resolved = state.gate.resolve().await;
    Json(gate_response(state.gate.tenancy(), resolved))
}

/// POST /v1/activate - Enter a license code
pub async fn activate(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<GateResponse>, ApiError> {
    if state.gate.tenancy() == Tenancy::Single {
        return Err(ApiError::InvalidInput(
            "this portal does not use license activation".to_string(),
        ));
    }
    let resolved = state
        .gate
        .activate(&req.code)
        .await
        .map_err(ApiError::ActivationFailed)?;
    Ok(Json(gate_response(state.gate.tenancy(), resolved)))
}

// === Theme ===

/// GET /v1/theme
pub async fn get_theme(State(state): State<AppState>) -> Json<ThemeBody> {
    Json(ThemeBody {
        theme: state.local.theme().await,
    })
}

/// PUT /v1/theme - Set a theme, or toggle when none is given
pub async fn set_theme(
    State(state): State<AppState>,
    body: Option<Json<ThemeRequest>>,
) -> Json<ThemeBody> {
    let requested = body.and_then(|Json(req)| req.theme);
    let theme = match requested {
        Some(theme) => state.local.set_theme(theme).await,
        None => state.local.toggle_theme().await,
    };
    Json(ThemeBody { theme })
}

// === Dashboard ===

/// GET /v1/dashboard - Navigation for the caller's role, plus student stats
pub async fn dashboard(
    Extension(tenant): Extension<Tenant>,
    auth: Authenticated,
) -> Result<Json<DashboardResponse>, ApiError> {
    let branding = load_branding(&tenant.store).await;
    let teacher_info = branding.teacher_info();
    let restrictions = &tenant.restrictions;

    let response = match auth.session.user {
        SessionUser::Student { status, .. } => DashboardResponse {
            role: Role::Student,
            nav: student_nav(&restrictions.student_features),
            site_name: branding.site_name,
            teacher_info,
            stats: Some(ContentStats {
                notes: accessible::<Note>(&tenant.store, status).await,
                tutes: accessible::<Tutorial>(&tenant.store, status).await,
                videos: accessible::<Video>(&tenant.store, status).await,
            }),
            status: Some(status),
        },
        SessionUser::Admin { .. } => DashboardResponse {
            role: Role::Admin,
            nav: admin_nav(&restrictions.admin_features),
            site_name: branding.site_name,
            teacher_info,
            stats: None,
            status: None,
        },
        SessionUser::SuperAdmin => return Err(AuthError::Forbidden.into()),
    };
    Ok(Json(response))
}

// === License notices ===

/// GET /v1/admin/license-notices - Unread messages from the super admin
pub async fn license_notices(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
) -> Json<Vec<TenantNoticeView>> {
    let Some(code) = &tenant.license_code else {
        return Json(Vec::new());
    };
    let mut notices: Vec<TenantNoticeView> = tenant
        .store
        .collection_as::<TenantNotice>(&tenant_notices_path(code))
        .await
        .into_iter()
        .filter(|r| !r.item.read)
        .map(|r| TenantNoticeView {
            id: r.id,
            notice: r.item,
        })
        .collect();
    notices.sort_by(|a, b| b.notice.created_at.cmp(&a.notice.created_at));
    Json(notices)
}

/// POST /v1/admin/license-notices/:id/dismiss
pub async fn dismiss_license_notice(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let code = tenant
        .license_code
        .as_deref()
        .ok_or(ApiError::NotFound("Notice not found"))?;
    let path = child_path(&tenant_notices_path(code), &id)?;
    if tenant.store.get(&path).await.is_none() {
        return Err(ApiError::NotFound("Notice not found"));
    }

    let mut fields = Map::new();
    fields.insert("read".to_string(), Value::Bool(true));
    ensure_written(tenant.store.update(&path, fields).await)?;
    info!(license = %code, notice = %id, "License notice dismissed");
    Ok(Json(SuccessResponse::ok()))
}
