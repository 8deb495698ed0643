//! Notes, tutorials and videos.
//!
//! Every route takes the collection as `:kind` and dispatches to a handler
//! generic over [`Content`], so the three kinds share one code path.

use super::{attachment, child_path, ensure_written, ApiError};
use crate::auth::{AdminSession, StudentSession};
use crate::gate::Tenant;
use crate::media;
use crate::models::{ConfirmQuery, ContentListResponse, ContentQuery, CreatedResponse, SuccessResponse};
use crate::store::Store;
use axum::{
    extract::{Path, Query},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use chrono::Utc;
use portal_core::catalog;
use portal_core::{
    is_locked, Access, Content, ContentFilter, ContentKind, DocumentViewer, Note, Tutorial, Video,
    VideoSource, ViewModel,
};
use serde_json::Value;
use tracing::{debug, info};

use super::settings::load_branding;

async fn fetch<T: Content>(store: &Store, id: &str) -> Result<T, ApiError> {
    let path = child_path(T::KIND.path(), id)?;
    store
        .get_as::<T>(&path)
        .await
        .ok_or(ApiError::NotFound("Content not found"))
}

fn ensure_unlocked(access: Access, viewer: Access) -> Result<(), ApiError> {
    if is_locked(access, viewer) {
        return Err(ApiError::ContentLocked);
    }
    Ok(())
}

/// Items a viewer with `viewer` status can open, for dashboard stats.
pub(crate) async fn accessible<T: Content>(store: &Store, viewer: Access) -> usize {
    let records = store.collection_as::<T>(T::KIND.path()).await;
    catalog::accessible_count(&records, viewer)
}

// === Student routes ===

/// GET /v1/content/:kind - Filtered cards, newest first
pub async fn list(
    Extension(tenant): Extension<Tenant>,
    student: StudentSession,
    Path(kind): Path<String>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<ContentListResponse>, ApiError> {
    let kind: ContentKind = kind.parse()?;
    let filter = ContentFilter::parse(
        query.access.as_deref(),
        query.month.as_deref(),
        query.tutorial_type.as_deref(),
    )?;

    let response = match kind {
        ContentKind::Notes => list_kind::<Note>(&tenant.store, &filter, student.status).await,
        ContentKind::Tutorials => {
            list_kind::<Tutorial>(&tenant.store, &filter, student.status).await
        }
        ContentKind::Videos => list_kind::<Video>(&tenant.store, &filter, student.status).await,
    };
    Ok(Json(response))
}

async fn list_kind<T: Content>(
    store: &Store,
    filter: &ContentFilter,
    viewer: Access,
) -> ContentListResponse {
    let records = store.collection_as::<T>(T::KIND.path()).await;
    let months = catalog::available_months(&records);
    let items = catalog::list(records, filter);
    ContentListResponse {
        total: items.len(),
        items: catalog::cards(&items, viewer),
        months,
    }
}

/// GET /v1/content/:kind/:id/view - Document viewer or video player
pub async fn view(
    Extension(tenant): Extension<Tenant>,
    student: StudentSession,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<ViewModel>, ApiError> {
    let kind: ContentKind = kind.parse()?;
    let store = &tenant.store;

    let view = match kind {
        ContentKind::Notes => {
            let note = fetch::<Note>(store, &id).await?;
            document_view(store, &note, student.status).await?
        }
        ContentKind::Tutorials => {
            let tute = fetch::<Tutorial>(store, &id).await?;
            document_view(store, &tute, student.status).await?
        }
        ContentKind::Videos => {
            let video = fetch::<Video>(store, &id).await?;
            ensure_unlocked(video.base.access, student.status)?;
            ViewModel::Video {
                title: video.base.title.clone(),
                player: video.player(),
            }
        }
    };

    debug!(kind = %kind, id = %id, "Content opened");
    Ok(Json(view))
}

async fn document_view<T: Content>(
    store: &Store,
    item: &T,
    viewer: Access,
) -> Result<ViewModel, ApiError> {
    let base = item.base();
    ensure_unlocked(base.access, viewer)?;
    let file = item
        .media_ref()
        .ok_or(ApiError::NotFound("File not available"))?;
    let site_name = load_branding(store).await.site_name;
    Ok(ViewModel::Document(DocumentViewer::new(
        &base.title,
        file,
        base.downloadable,
        &site_name,
    )))
}

/// GET /v1/content/:kind/:id/download - File bytes or a redirect to its URL
pub async fn download(
    Extension(tenant): Extension<Tenant>,
    student: StudentSession,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let kind: ContentKind = kind.parse()?;
    let store = &tenant.store;

    let (title, access, downloadable, file) = match kind {
        ContentKind::Notes => download_parts(&fetch::<Note>(store, &id).await?),
        ContentKind::Tutorials => download_parts(&fetch::<Tutorial>(store, &id).await?),
        ContentKind::Videos => {
            let video = fetch::<Video>(store, &id).await?;
            // Only uploaded files can be downloaded; links play in place.
            if !matches!(video.source, VideoSource::File { .. }) {
                return Err(ApiError::DownloadDisabled);
            }
            download_parts(&video)
        }
    };

    ensure_unlocked(access, student.status)?;
    if !downloadable {
        return Err(ApiError::DownloadDisabled);
    }
    let file = file.ok_or(ApiError::NotFound("File not available"))?;

    if !file.starts_with("data:") {
        if HeaderValue::from_str(&file).is_err() {
            return Err(ApiError::NotFound("File not available"));
        }
        return Ok(Redirect::temporary(&file).into_response());
    }

    let (mime, bytes) = media::decode_data_uri(&file)?;
    let filename = download_filename(&title, &mime);
    info!(kind = %kind, id = %id, size = bytes.len(), "Content downloaded");
    Ok((
        [(CONTENT_TYPE, mime), (CONTENT_DISPOSITION, attachment(&filename))],
        bytes,
    )
        .into_response())
}

fn download_parts<T: Content>(item: &T) -> (String, Access, bool, Option<String>) {
    let base = item.base();
    (
        base.title.clone(),
        base.access,
        base.downloadable,
        item.media_ref().map(str::to_string),
    )
}

/// Header-safe file name from the title plus an extension from the MIME type.
fn download_filename(title: &str, mime: &str) -> String {
    fn clean(s: &str) -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ' ' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    let stem = clean(title.trim());
    let stem = if stem.is_empty() { "download".to_string() } else { stem };
    let ext = match mime {
        "application/pdf" => "pdf".to_string(),
        other => clean(other.rsplit('/').next().unwrap_or("bin")),
    };
    format!("{stem}.{ext}")
}

// === Admin routes ===

/// GET /v1/admin/content/:kind - All records, newest first
pub async fn admin_list(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path(kind): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let kind: ContentKind = kind.parse()?;
    let items = match kind {
        ContentKind::Notes => admin_list_kind::<Note>(&tenant.store).await?,
        ContentKind::Tutorials => admin_list_kind::<Tutorial>(&tenant.store).await?,
        ContentKind::Videos => admin_list_kind::<Video>(&tenant.store).await?,
    };
    Ok(Json(items))
}

async fn admin_list_kind<T: Content>(store: &Store) -> Result<Value, ApiError> {
    let mut items = store.collection_as::<T>(T::KIND.path()).await;
    catalog::sort_newest_first(&mut items);
    serde_json::to_value(items).map_err(|_| ApiError::Internal)
}

/// POST /v1/admin/content/:kind - Add a record
pub async fn create(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let kind: ContentKind = kind.parse()?;
    let id = match kind {
        ContentKind::Notes => create_kind::<Note>(&tenant.store, body).await?,
        ContentKind::Tutorials => create_kind::<Tutorial>(&tenant.store, body).await?,
        ContentKind::Videos => create_kind::<Video>(&tenant.store, body).await?,
    };
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn create_kind<T: Content>(store: &Store, body: Value) -> Result<String, ApiError> {
    let mut item: T = serde_json::from_value(body)?;
    item.validate(true)?;
    item.prepare_create();
    item.base_mut().created_at = Some(Utc::now().timestamp_millis());

    let id = store
        .push_as(T::KIND.path(), &item)
        .await
        .ok_or(ApiError::StoreFailure)?;
    info!(kind = %T::KIND, id = %id, "Content created");
    Ok(id)
}

/// PUT /v1/admin/content/:kind/:id - Replace a record, keeping its file
/// and creation time when the edit leaves them out
pub async fn update(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path((kind, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let kind: ContentKind = kind.parse()?;
    match kind {
        ContentKind::Notes => update_kind::<Note>(&tenant.store, &id, body).await?,
        ContentKind::Tutorials => update_kind::<Tutorial>(&tenant.store, &id, body).await?,
        ContentKind::Videos => update_kind::<Video>(&tenant.store, &id, body).await?,
    }
    Ok(Json(SuccessResponse::ok()))
}

async fn update_kind<T: Content>(store: &Store, id: &str, body: Value) -> Result<(), ApiError> {
    let path = child_path(T::KIND.path(), id)?;
    let existing = fetch::<T>(store, id).await?;

    let mut item: T = serde_json::from_value(body)?;
    item.prepare_update(&existing);
    item.base_mut().created_at = existing.base().created_at;
    item.validate(false)?;

    ensure_written(store.set_as(&path, &item).await)?;
    info!(kind = %T::KIND, id = %id, "Content updated");
    Ok(())
}

/// DELETE /v1/admin/content/:kind/:id?confirm=true
pub async fn delete(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path((kind, id)): Path<(String, String)>,
    Query(confirm): Query<ConfirmQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let kind: ContentKind = kind.parse()?;
    if !confirm.confirm {
        return Err(ApiError::ConfirmationRequired(
            "Are you sure you want to delete this item? Repeat with confirm=true.",
        ));
    }

    let path = child_path(kind.path(), &id)?;
    if tenant.store.get(&path).await.is_none() {
        return Err(ApiError::NotFound("Content not found"));
    }
    ensure_written(tenant.store.delete(&path).await)?;
    info!(kind = %kind, id = %id, "Content deleted");
    Ok(Json(SuccessResponse::ok()))
}
