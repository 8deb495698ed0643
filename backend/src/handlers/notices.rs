//! Notice and banner board.

use super::{child_path, ensure_written, ApiError};
use crate::auth::{AdminSession, StudentSession};
use crate::gate::Tenant;
use crate::models::{ConfirmQuery, CreatedResponse, SuccessResponse};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use portal_core::notice::visible_notices;
use portal_core::{Notice, NoticeFeed, Record};
use tracing::info;

const NOTICES: &str = "notices";

/// GET /v1/notices - Visible banners and text notices
pub async fn feed(Extension(tenant): Extension<Tenant>, _student: StudentSession) -> Json<NoticeFeed> {
    let records = tenant.store.collection_as::<Notice>(NOTICES).await;
    Json(visible_notices(
        &records,
        &tenant.restrictions.notice_restrictions,
    ))
}

/// GET /v1/admin/notices - Every notice, active or not
pub async fn admin_list(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
) -> Json<Vec<Record<Notice>>> {
    Json(tenant.store.collection_as::<Notice>(NOTICES).await)
}

/// POST /v1/admin/notices
pub async fn create(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Json(notice): Json<Notice>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    notice.validate()?;
    let id = tenant
        .store
        .push_as(NOTICES, &notice)
        .await
        .ok_or(ApiError::StoreFailure)?;
    info!(notice = %id, "Notice created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PUT /v1/admin/notices/:id - Replace; a banner edit without an image
/// keeps the stored one
pub async fn update(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path(id): Path<String>,
    Json(mut notice): Json<Notice>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let path = child_path(NOTICES, &id)?;
    let existing = tenant
        .store
        .get_as::<Notice>(&path)
        .await
        .ok_or(ApiError::NotFound("Notice not found"))?;

    notice.retain_image(&existing);
    notice.validate()?;
    ensure_written(tenant.store.set_as(&path, &notice).await)?;
    info!(notice = %id, active = notice.active, "Notice updated");
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /v1/admin/notices/:id?confirm=true
pub async fn delete(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !confirm.confirm {
        return Err(ApiError::ConfirmationRequired(
            "Delete this notice? Repeat with confirm=true.",
        ));
    }
    let path = child_path(NOTICES, &id)?;
    if tenant.store.get(&path).await.is_none() {
        return Err(ApiError::NotFound("Notice not found"));
    }
    ensure_written(tenant.store.delete(&path).await)?;
    info!(notice = %id, "Notice deleted");
    Ok(Json(SuccessResponse::ok()))
}
