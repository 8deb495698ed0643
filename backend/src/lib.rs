//! # Portal Backend
//!
//! HTTP server for a teacher's e-learning portal: notes, tutes and videos,
//! a student directory, notices and branding, backup/restore, and a
//! super-admin layer that licenses tenants.
//!
//! ## Design
//!
//! - **One JSON tree**: every record lives in a path-addressed key-value
//!   store (memory or JSON files on disk)
//! - **Tenant scoping**: in multi-tenant mode each license's data lives under
//!   `superAdmin/licenses/<CODE>/data/`; the `superAdmin` root is never scoped
//! - **Gate first**: portal routes resolve the license gate on every request
//!   and answer 503 with a screen when the portal may not run
//! - **Sessions in RAM**: bearer tokens, stored hashed, 24h (4h for the
//!   super admin)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────┐     ┌──────────┐     ┌──────────────┐
//! │   Browser   │────▶│  Router  │────▶│   Gate   │────▶│   Handlers   │
//! └─────────────┘     └──────────┘     └──────────┘     └──────┬───────┘
//!                          │                                   │
//!                   super-admin routes                  ┌──────┴──────┐
//!                     (ungated)                         │    Store    │
//!                                                       └──────┬──────┘
//!                                                        Memory | Files
//! ```
//!
//! ## API Overview
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/health` | GET | Health check |
//! | `/v1/gate` | GET | Gate state and blocking screen |
//! | `/v1/activate` | POST | Enter a license code |
//! | `/v1/theme` | GET/PUT | Device theme |
//! | `/v1/auth/login` | POST | Student or admin login |
//! | `/v1/auth/logout` | POST | End session |
//! | `/v1/auth/session` | GET | Current session |
//! | `/v1/branding` | GET | Site branding and teacher info |
//! | `/v1/dashboard` | GET | Navigation and stats |
//! | `/v1/notices` | GET | Visible notices |
//! | `/v1/content/:kind` | GET | Filtered content cards |
//! | `/v1/content/:kind/:id/view` | GET | Viewer or player |
//! | `/v1/content/:kind/:id/download` | GET | Download a file |
//! | `/v1/admin/...` | * | Tenant administration |
//! | `/v1/super/...` | * | Super-admin surface |

pub mod auth;
pub mod config;
pub mod gate;
pub mod handlers;
pub mod kv;
pub mod local_state;
pub mod media;
pub mod models;
pub mod store;

pub use config::Config;
pub use handlers::AppState;
pub use store::Store;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use handlers::{content, directory, notices, portal, settings, super_admin};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Build the Axum router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    // Routes that only run while the gate is open
    let gated = Router::new()
        // Sessions
        .route("/v1/auth/login", post(directory::login))
        .route("/v1/auth/logout", post(directory::logout))
        .route("/v1/auth/session", get(directory::current))
        // Student portal
        .route("/v1/branding", get(settings::get_branding))
        .route("/v1/dashboard", get(portal::dashboard))
        .route("/v1/notices", get(notices::feed))
        .route("/v1/content/:kind", get(content::list))
        .route("/v1/content/:kind/:id/view", get(content::view))
        .route("/v1/content/:kind/:id/download", get(content::download))
        // Admin: content
        .route(
            "/v1/admin/content/:kind",
            get(content::admin_list).post(content::create),
        )
        .route(
            "/v1/admin/content/:kind/:id",
            put(content::update).delete(content::delete),
        )
        // Admin: students and account
        .route(
            "/v1/admin/students",
            get(directory::list_students).post(directory::create_student),
        )
        .route(
            "/v1/admin/students/:id",
            put(directory::update_student).delete(directory::delete_student),
        )
        .route("/v1/admin/credentials", put(directory::update_credentials))
        .route("/v1/admin/overview", get(directory::overview))
        // Admin: notices
        .route(
            "/v1/admin/notices",
            get(notices::admin_list).post(notices::create),
        )
        .route(
            "/v1/admin/notices/:id",
            put(notices::update).delete(notices::delete),
        )
        .route("/v1/admin/license-notices", get(portal::license_notices))
        .route(
            "/v1/admin/license-notices/:id/dismiss",
            post(portal::dismiss_license_notice),
        )
        // Admin: settings
        .route("/v1/admin/branding", put(settings::update_branding))
        .route(
            "/v1/admin/branding/logo",
            put(settings::set_logo).delete(settings::clear_logo),
        )
        .route("/v1/admin/backup", get(settings::export_backup))
        .route("/v1/admin/backup/import", post(settings::import_backup))
        .route("/v1/admin/reset", post(settings::reset))
        .route("/v1/admin/uploads", post(settings::upload))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_open,
        ));

    let super_admin = Router::new()
        .route("/v1/super/login", post(super_admin::login))
        .route("/v1/super/logout", post(super_admin::logout))
        .route("/v1/super/credentials", put(super_admin::update_credentials))
        .route(
            "/v1/super/restrictions",
            get(super_admin::get_restrictions).put(super_admin::save_restrictions),
        )
        .route("/v1/super/site-status", put(super_admin::set_site_status))
        .route("/v1/super/notices", get(super_admin::list_notices))
        .route("/v1/super/notices/:id", put(super_admin::toggle_notice))
        .route(
            "/v1/super/licenses",
            get(super_admin::list_licenses).post(super_admin::create_license),
        )
        .route(
            "/v1/super/licenses/:code",
            get(super_admin::get_license)
                .put(super_admin::update_license)
                .delete(super_admin::delete_license),
        )
        .route(
            "/v1/super/licenses/:code/notices",
            get(super_admin::list_tenant_notices).post(super_admin::send_tenant_notice),
        )
        .route(
            "/v1/super/licenses/:code/notices/:id",
            axum::routing::delete(super_admin::delete_tenant_notice),
        )
        .route("/v1/super/statistics", get(super_admin::statistics))
        .route("/v1/super/export", get(super_admin::export_all))
        .route("/v1/super/import", post(super_admin::import_all))
        .route("/v1/super/reset", post(super_admin::reset_all));

    let max_body = state.config.max_upload_bytes;

    Router::new()
        // Health check (unauthenticated)
        .route("/health", get(handlers::health))
        // Gate and device settings
        .route("/v1/gate", get(portal::gate_status))
        .route("/v1/activate", post(portal::activate))
        .route("/v1/theme", get(portal::get_theme).put(portal::set_theme))
        .merge(gated)
        .merge(super_admin)
        // Middleware stack (order matters: first added = outermost)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
