//! WebAssembly bindings for the portal domain core.
//!
//! Lets the browser build apply the same rules the server does: URL
//! parsing for video sources, access locking, list filtering and ordering,
//! notice visibility and the license gate. Records cross the boundary as
//! JSON strings; times as epoch milliseconds.

use chrono::{DateTime, Utc};
use portal_core::{
    catalog, calendar, license, notice, video, Access, Content, ContentFilter, ContentKind,
    GateDecision, License, Note, Notice, Record, Tutorial, Video,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(js_err)
}

fn instant(now_ms: f64) -> Result<DateTime<Utc>, JsError> {
    DateTime::from_timestamp_millis(now_ms as i64).ok_or_else(|| JsError::new("Invalid timestamp"))
}

/// Parse a collection object (`{ id: record }`) into records, skipping
/// entries that do not fit the schema.
fn records<T: DeserializeOwned>(collection_json: &str) -> Result<Vec<Record<T>>, JsError> {
    let collection: Map<String, Value> = match serde_json::from_str(collection_json).map_err(js_err)? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => return Err(JsError::new("Collection must be a JSON object")),
    };
    Ok(collection
        .into_iter()
        .filter_map(|(id, raw)| serde_json::from_value(raw).ok().map(|item| Record::new(id, item)))
        .collect())
}

// === Video URLs ===

/// Extract the 11-character YouTube video ID, or `undefined`.
#[wasm_bindgen]
pub fn youtube_id(url: &str) -> Option<String> {
    video::extract_youtube_id(url)
}

/// Extract a Google Drive file ID, or `undefined`.
#[wasm_bindgen]
pub fn drive_id(url: &str) -> Option<String> {
    video::extract_drive_id(url)
}

/// Thumbnail URL for a YouTube link, or `undefined` when no ID is found.
#[wasm_bindgen]
pub fn youtube_thumbnail(url: &str) -> Option<String> {
    video::extract_youtube_id(url).map(|id| video::youtube_thumbnail_url(&id))
}

// === Catalog ===

/// `"2024-03"` as `"Mar 2024"`, or `undefined` for a malformed month.
#[wasm_bindgen]
pub fn format_month(value: &str) -> Option<String> {
    calendar::format_month(value)
}

/// Whether an item with `item_access` is locked for a viewer with
/// `viewer_access` (both `"free"` or `"paid"`).
#[wasm_bindgen]
pub fn is_locked(item_access: &str, viewer_access: &str) -> Result<bool, JsError> {
    let item: Access = item_access.parse().map_err(js_err)?;
    let viewer: Access = viewer_access.parse().map_err(js_err)?;
    Ok(portal_core::is_locked(item, viewer))
}

fn cards_for<T: Content>(
    collection_json: &str,
    filter: &ContentFilter,
    viewer: Access,
) -> Result<String, JsError> {
    let all = records::<T>(collection_json)?;
    let months = catalog::available_months(&all);
    let listed = catalog::list(all, filter);
    to_json(&json!({
        "items": catalog::cards(&listed, viewer),
        "months": months,
        "total": listed.len(),
    }))
}

/// Filter, order and redact one collection for a viewer.
///
/// # Arguments
/// * `kind` - `"notes"`, `"tutes"` or `"videos"`
/// * `collection_json` - The stored collection object
/// * `viewer_access` - `"free"` or `"paid"`
/// * `access`, `month`, `tutorial_type` - Optional filters
///
/// # Returns
/// `{ items, months, total }` as JSON, newest first.
#[wasm_bindgen]
pub fn list_content(
    kind: &str,
    collection_json: &str,
    viewer_access: &str,
    access: Option<String>,
    month: Option<String>,
    tutorial_type: Option<String>,
) -> Result<String, JsError> {
    let kind: ContentKind = kind.parse().map_err(js_err)?;
    let viewer: Access = viewer_access.parse().map_err(js_err)?;
    let filter = ContentFilter::parse(access.as_deref(), month.as_deref(), tutorial_type.as_deref())
        .map_err(js_err)?;

    match kind {
        ContentKind::Notes => cards_for::<Note>(collection_json, &filter, viewer),
        ContentKind::Tutorials => cards_for::<Tutorial>(collection_json, &filter, viewer),
        ContentKind::Videos => cards_for::<Video>(collection_json, &filter, viewer),
    }
}

// === Notices ===

/// Visible banners and text notices after per-notice overrides.
///
/// `overrides_json` is the `noticeRestrictions` object; pass `"{}"` when
/// there is none.
#[wasm_bindgen]
pub fn visible_notices(notices_json: &str, overrides_json: &str) -> Result<String, JsError> {
    let notices = records::<Notice>(notices_json)?;
    let overrides: BTreeMap<String, bool> = serde_json::from_str(overrides_json).map_err(js_err)?;
    to_json(&notice::visible_notices(&notices, &overrides))
}

// === License gate ===

/// Evaluate a license record (or `null`) at `now_ms`.
///
/// # Returns
/// `{ "open": true, "restrictions": {...} }` or
/// `{ "open": false, "code": "...", "screen": {...} }` as JSON.
#[wasm_bindgen]
pub fn evaluate_license(license_json: &str, now_ms: f64) -> Result<String, JsError> {
    let record: Option<License> = serde_json::from_str(license_json).map_err(js_err)?;
    let now = instant(now_ms)?;
    let decision = license::evaluate(record.as_ref(), now);
    let value = match decision {
        GateDecision::Open(restrictions) => json!({ "open": true, "restrictions": restrictions }),
        GateDecision::NotFound => json!({ "open": false, "code": "ACTIVATION_REQUIRED" }),
        GateDecision::Suspended(screen) | GateDecision::Maintenance(screen) => {
            json!({ "open": false, "code": "MAINTENANCE", "screen": screen })
        }
        GateDecision::Expired(screen) => {
            json!({ "open": false, "code": "LICENSE_EXPIRED", "screen": screen })
        }
    };
    to_json(&value)
}

/// Whether a date (`YYYY-MM-DD` or RFC 3339) has passed at `now_ms`.
#[wasm_bindgen]
pub fn is_past(value: &str, now_ms: f64) -> Result<bool, JsError> {
    Ok(calendar::is_past(value, instant(now_ms)?))
}

/// Library version.
#[wasm_bindgen]
pub fn version() -> String {
    portal_core::VERSION.to_string()
}
