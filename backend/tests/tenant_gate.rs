//! Integration tests for multi-tenant mode and the super-admin surface.
//!
//! Licenses are created through the super-admin API, activated through the
//! gate, and each tenant's data is checked for isolation.

use axum::http::{header, StatusCode};
use axum_test::TestServer;
use portal_backend::{
    build_router,
    config::{Config, Tenancy},
    handlers::{super_admin, AppState},
    kv::MemoryBackend,
    local_state::LocalState,
};
use serde_json::{json, Value};
use std::sync::Arc;

const PDF: &str = "data:application/pdf;base64,SGVsbG8=";

/// Build a multi-tenant test server with super-admin defaults seeded
async fn build_test_server() -> TestServer {
    let config = Config {
        tenancy: Tenancy::Multi,
        ..Config::in_memory()
    };
    let state = AppState::new(
        config,
        Arc::new(MemoryBackend::new()),
        LocalState::in_memory(),
    );
    super_admin::seed_defaults(&state.store).await;
    TestServer::new(build_router(state)).unwrap()
}

fn auth_header(token: &str) -> String {
    format!("Bearer {}", token)
}

async fn super_token(server: &TestServer) -> String {
    let response = server
        .post("/v1/super/login")
        .json(&json!({ "accessKey": "superadmin@dev.com", "securityCode": "SuperAdmin@2024!" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

async fn create_license(server: &TestServer, token: &str, code: &str, license: Value) {
    let mut body = license;
    body["code"] = json!(code);
    server
        .post("/v1/super/licenses")
        .add_header(header::AUTHORIZATION, auth_header(token))
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);
}

async fn activate(server: &TestServer, code: &str) {
    let response = server.post("/v1/activate").json(&json!({ "code": code })).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], "open");
}

async fn admin_token(server: &TestServer) -> String {
    let response = server
        .post("/v1/auth/login")
        .json(&json!({ "email": "admin@admin.com", "password": "admin123", "role": "admin" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

// =============================================================================
// Activation
// =============================================================================

#[tokio::test]
async fn test_portal_requires_activation() {
    let server = build_test_server().await;

    let gate: Value = server.get("/v1/gate").await.json();
    assert_eq!(gate["state"], "activationRequired");
    assert_eq!(gate["tenancy"], "multi");

    let response = server.get("/v1/branding").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "ACTIVATION_REQUIRED");

    // Health and super-admin routes are never gated
    server.get("/health").await.assert_status_ok();
    super_token(&server).await;
}

#[tokio::test]
async fn test_activation_refusals() {
    let server = build_test_server().await;
    let token = super_token(&server).await;

    create_license(&server, &token, "OLD", json!({ "status": "active", "expiry": "2020-01-01" })).await;
    create_license(&server, &token, "HOLD", json!({ "status": "suspended" })).await;

    for code in ["NOPE", "old", "HOLD", "../admin"] {
        let response = server.post("/v1/activate").json(&json!({ "code": code })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "ACTIVATION_FAILED");
    }

    let gate: Value = server.get("/v1/gate").await.json();
    assert_eq!(gate["state"], "activationRequired");
}

#[tokio::test]
async fn test_activation_seeds_tenant_and_opens_portal() {
    let server = build_test_server().await;
    let token = super_token(&server).await;
    create_license(&server, &token, "SCHOOL-A", json!({ "name": "School A" })).await;

    // Codes are normalised
    activate(&server, "  school-a ").await;

    let gate: Value = server.get("/v1/gate").await.json();
    assert_eq!(gate["licenseCode"], "SCHOOL-A");

    let branding: Value = server.get("/v1/branding").await.json();
    assert_eq!(branding["siteName"], "Media Studies A/L");
    admin_token(&server).await;

    let license: Value = server
        .get("/v1/super/licenses/SCHOOL-A")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert_eq!(license["hasData"], true);
    assert_eq!(license["expired"], false);
}

// =============================================================================
// Isolation
// =============================================================================

#[tokio::test]
async fn test_tenant_data_and_sessions_are_isolated() {
    let server = build_test_server().await;
    let token = super_token(&server).await;
    create_license(&server, &token, "A", json!({})).await;
    create_license(&server, &token, "B", json!({})).await;

    activate(&server, "A").await;
    let admin_a = admin_token(&server).await;
    server
        .post("/v1/admin/content/notes")
        .add_header(header::AUTHORIZATION, auth_header(&admin_a))
        .json(&json!({ "title": "Tenant A note", "file": PDF }))
        .await
        .assert_status(StatusCode::CREATED);

    activate(&server, "B").await;

    // A's session does not carry over to B
    server
        .get("/v1/admin/content/notes")
        .add_header(header::AUTHORIZATION, auth_header(&admin_a))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let admin_b = admin_token(&server).await;
    let notes: Value = server
        .get("/v1/admin/content/notes")
        .add_header(header::AUTHORIZATION, auth_header(&admin_b))
        .await
        .json();
    assert!(notes.as_array().unwrap().is_empty());

    let stats: Value = server
        .get("/v1/super/statistics?license=A")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert_eq!(stats["license"], "A");
    assert_eq!(stats["notes"], 1);

    let stats: Value = server
        .get("/v1/super/statistics?license=B")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert_eq!(stats["notes"], 0);

    let global: Value = server
        .get("/v1/super/statistics")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert_eq!(global["licenses"], 2);
    assert!(global["lastLogin"].is_string());
}

// =============================================================================
// License lifecycle
// =============================================================================

#[tokio::test]
async fn test_suspension_and_maintenance_close_the_portal() {
    let server = build_test_server().await;
    let token = super_token(&server).await;
    create_license(&server, &token, "ACME", json!({})).await;
    activate(&server, "ACME").await;

    server
        .put("/v1/super/licenses/ACME")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "status": "suspended" }))
        .await
        .assert_status_ok();

    let response = server.get("/v1/branding").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "MAINTENANCE");
    assert_eq!(body["screen"]["title"], "Access Suspended");

    server
        .put("/v1/super/licenses/ACME")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "status": "active" }))
        .await
        .assert_status_ok();
    server.get("/v1/branding").await.assert_status_ok();

    // Per-license site switch
    server
        .put("/v1/super/site-status?license=ACME")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "siteEnabled": false, "maintenanceMessage": "Upgrading" }))
        .await
        .assert_status_ok();
    let body: Value = server.get("/v1/branding").await.json();
    assert_eq!(body["code"], "MAINTENANCE");
    assert_eq!(body["screen"]["message"], "Upgrading");
}

#[tokio::test]
async fn test_expired_license_shows_expiry_screen() {
    let server = build_test_server().await;
    let token = super_token(&server).await;
    create_license(&server, &token, "TERM", json!({})).await;
    activate(&server, "TERM").await;

    server
        .put("/v1/super/licenses/TERM")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "expiry": "2020-01-01" }))
        .await
        .assert_status_ok();

    let response = server.get("/v1/dashboard").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "LICENSE_EXPIRED");

    // An empty expiry clears it
    server
        .put("/v1/super/licenses/TERM")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "expiry": "" }))
        .await
        .assert_status_ok();
    server.get("/v1/branding").await.assert_status_ok();
}

#[tokio::test]
async fn test_deleted_license_requires_reactivation() {
    let server = build_test_server().await;
    let token = super_token(&server).await;
    create_license(&server, &token, "GONE", json!({})).await;
    activate(&server, "GONE").await;

    server
        .delete("/v1/super/licenses/GONE")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .delete("/v1/super/licenses/GONE?confirm=true")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .assert_status_ok();

    let gate: Value = server.get("/v1/gate").await.json();
    assert_eq!(gate["state"], "activationRequired");
}

#[tokio::test]
async fn test_duplicate_and_invalid_license_codes() {
    let server = build_test_server().await;
    let token = super_token(&server).await;
    create_license(&server, &token, "DUP", json!({})).await;

    for body in [
        json!({ "code": "dup" }),
        json!({ "code": "has space" }),
        json!({ "code": "BADDATE", "expiry": "someday" }),
    ] {
        server
            .post("/v1/super/licenses")
            .add_header(header::AUTHORIZATION, auth_header(&token))
            .json(&body)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    let list: Value = server
        .get("/v1/super/licenses")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["code"], "DUP");
}

// =============================================================================
// Tenant notices
// =============================================================================

#[tokio::test]
async fn test_tenant_notices_reach_the_admin() {
    let server = build_test_server().await;
    let token = super_token(&server).await;
    create_license(&server, &token, "NEWS", json!({})).await;
    activate(&server, "NEWS").await;

    let response = server
        .post("/v1/super/licenses/NEWS/notices")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "title": "Renewal", "message": "Due next month", "priority": "warning" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    let admin = admin_token(&server).await;
    let unread: Value = server
        .get("/v1/admin/license-notices")
        .add_header(header::AUTHORIZATION, auth_header(&admin))
        .await
        .json();
    assert_eq!(unread.as_array().unwrap().len(), 1);
    assert_eq!(unread[0]["title"], "Renewal");

    server
        .post(&format!("/v1/admin/license-notices/{id}/dismiss"))
        .add_header(header::AUTHORIZATION, auth_header(&admin))
        .await
        .assert_status_ok();

    let unread: Value = server
        .get("/v1/admin/license-notices")
        .add_header(header::AUTHORIZATION, auth_header(&admin))
        .await
        .json();
    assert!(unread.as_array().unwrap().is_empty());

    // The super admin still sees it, marked read
    let sent: Value = server
        .get("/v1/super/licenses/NEWS/notices")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert_eq!(sent[0]["read"], true);
}

// =============================================================================
// Super-admin account and whole namespace
// =============================================================================

#[tokio::test]
async fn test_super_admin_login_and_credentials() {
    let server = build_test_server().await;

    let response = server
        .post("/v1/super/login")
        .json(&json!({ "accessKey": "superadmin@dev.com", "securityCode": "wrong" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid credentials. Access denied.");

    let token = super_token(&server).await;

    // Unknown tokens are refused
    let response = server
        .get("/v1/super/licenses")
        .add_header(header::AUTHORIZATION, auth_header("not-a-token"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    server
        .put("/v1/super/credentials")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({
            "currentKey": "superadmin@dev.com",
            "currentCode": "SuperAdmin@2024!",
            "newKey": "root@example.com",
            "newCode": "n3w-c0de"
        }))
        .await
        .assert_status_ok();

    server
        .post("/v1/super/login")
        .json(&json!({ "accessKey": "root@example.com", "securityCode": "n3w-c0de" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_full_export_import_and_reset() {
    let server = build_test_server().await;
    let token = super_token(&server).await;
    create_license(&server, &token, "KEEP", json!({ "name": "Keeper" })).await;

    let response = server
        .get("/v1/super/export")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await;
    response.assert_status_ok();
    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert!(disposition.to_str().unwrap().contains("full-backup-"));
    let snapshot: Value = response.json();
    assert!(snapshot["superAdmin"]["licenses"]["KEEP"].is_object());

    // Reset needs the exact phrase
    server
        .post("/v1/super/reset")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "confirmation": "delete all" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/v1/super/reset")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "confirmation": "DELETE ALL" }))
        .await
        .assert_status_ok();

    let list: Value = server
        .get("/v1/super/licenses")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert!(list.as_array().unwrap().is_empty());

    // Credentials survive the reset
    super_token(&server).await;

    server
        .post("/v1/super/import")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "confirm": true, "data": snapshot }))
        .await
        .assert_status_ok();

    let license: Value = server
        .get("/v1/super/licenses/KEEP")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert_eq!(license["name"], "Keeper");
}

async fn export_tenant_backup(server: &TestServer, admin: &str) -> Value {
    let response = server
        .get("/v1/admin/backup")
        .add_header(header::AUTHORIZATION, auth_header(admin))
        .await;
    response.assert_status_ok();
    let mut backup: Value = response.json();
    backup.as_object_mut().unwrap().remove("exportDate");
    backup
}

#[tokio::test]
async fn test_tenant_backup_round_trip_is_exact() {
    let server = build_test_server().await;
    let token = super_token(&server).await;

    create_license(&server, &token, "ROUND", json!({ "status": "active" })).await;
    create_license(&server, &token, "OTHER", json!({ "status": "active" })).await;
    activate(&server, "ROUND").await;
    let admin = admin_token(&server).await;

    let posts = [
        ("/v1/admin/students", json!({ "name": "Asha", "email": "asha@example.com", "password": "pw", "status": "paid" })),
        ("/v1/admin/content/notes", json!({ "title": "Optics", "access": "paid", "month": "2024-03", "file": PDF })),
        ("/v1/admin/content/tutes", json!({ "title": "Paper 2019", "type": "old", "file": PDF })),
        ("/v1/admin/content/videos", json!({ "title": "Lesson 1", "source": "youtube", "youtube": "https://youtu.be/dQw4w9WgXcQ" })),
        ("/v1/admin/notices", json!({ "type": "text", "title": "Exam", "message": "Friday", "active": true })),
    ];
    for (path, body) in posts {
        server
            .post(path)
            .add_header(header::AUTHORIZATION, auth_header(&admin))
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
    }

    let before = export_tenant_backup(&server, &admin).await;
    assert!(before["videos"]
        .as_object()
        .unwrap()
        .values()
        .all(|v| v["thumbnail"].is_string()));

    server
        .post("/v1/admin/backup/import")
        .add_header(header::AUTHORIZATION, auth_header(&admin))
        .json(&json!({ "confirm": true, "document": before }))
        .await
        .assert_status_ok();
    assert_eq!(before, export_tenant_backup(&server, &admin).await);

    // The scoped import stays inside its own license
    let full: Value = server
        .get("/v1/super/export")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    let licenses = &full["superAdmin"]["licenses"];
    assert_eq!(licenses["ROUND"]["data"]["notes"], before["notes"]);
    assert!(licenses["OTHER"].get("data").is_none());
    assert!(full.get("notes").is_none());
}

#[tokio::test]
async fn test_full_export_import_round_trip_is_exact() {
    let server = build_test_server().await;
    let token = super_token(&server).await;

    create_license(&server, &token, "ONE", json!({ "name": "One", "expiry": "2999-12-31" })).await;
    activate(&server, "ONE").await;
    let admin = admin_token(&server).await;
    server
        .post("/v1/admin/content/notes")
        .add_header(header::AUTHORIZATION, auth_header(&admin))
        .json(&json!({ "title": "Optics", "file": PDF }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/v1/super/licenses/ONE/notices")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "title": "Renewal", "message": "Due soon" }))
        .await
        .assert_status(StatusCode::CREATED);

    let before: Value = server
        .get("/v1/super/export")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();

    server
        .post("/v1/super/import")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .json(&json!({ "confirm": true, "data": before }))
        .await
        .assert_status_ok();

    let after: Value = server
        .get("/v1/super/export")
        .add_header(header::AUTHORIZATION, auth_header(&token))
        .await
        .json();
    assert_eq!(before, after);
}
