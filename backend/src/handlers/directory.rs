//! Login, sessions, the student directory and the admin credential.

use super::{child_path, ensure_written, ApiError, AppState};
use crate::auth::{AdminSession, Authenticated, Session, SessionUser};
use crate::gate::Tenant;
use crate::models::{
    AdminOverview, ConfirmQuery, CreatedResponse, CredentialsRequest, LoginRequest,
    LoginResponse, LoginRole, SuccessResponse,
};
use crate::store::Store;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use portal_core::{Access, AdminCredential, ContentKind, Student, StudentSummary};
use serde_json::{Map, Value};
use tracing::{info, warn};

// === Sessions ===

/// POST /v1/auth/login - Student or admin login
pub async fn login(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::InvalidInput(
            "email and password are required".to_string(),
        ));
    }

    let user = match req.role {
        LoginRole::Student => student_login(&tenant.store, email, &req.password).await?,
        LoginRole::Admin => admin_login(&tenant.store, email, &req.password).await?,
    };

    let (token, session) = state
        .sessions
        .save_session(user, tenant.license_code.clone());
    Ok(Json(LoginResponse { token, session }))
}

async fn student_login(store: &Store, email: &str, password: &str) -> Result<SessionUser, ApiError> {
    let students = store.collection_as::<Student>("students").await;
    let Some(record) = students
        .into_iter()
        .find(|r| r.item.matches(email, password))
    else {
        warn!("Student login rejected");
        return Err(ApiError::InvalidCredentials("Invalid email or password"));
    };

    let now = Utc::now();
    let status = record.item.effective_status(now);
    if record.item.is_expired(now) {
        let mut fields = Map::new();
        fields.insert(
            "status".to_string(),
            Value::String(Access::Free.as_str().to_string()),
        );
        store
            .update(&format!("students/{}", record.id), fields)
            .await;
        info!(student = %record.id, "Paid access expired, reverted to free");
    }

    info!(student = %record.id, status = status.as_str(), "Student logged in");
    Ok(SessionUser::Student {
        id: record.id,
        name: record.item.name,
        email: record.item.email,
        status,
    })
}

async fn admin_login(store: &Store, email: &str, password: &str) -> Result<SessionUser, ApiError> {
    let Some(admin) = store.get_as::<AdminCredential>("admin").await else {
        store.set_as("admin", &AdminCredential::default()).await;
        warn!("Admin credential missing, restored defaults");
        return Err(ApiError::AdminInitialized);
    };

    if !admin.matches(email, password) {
        warn!("Admin login rejected");
        return Err(ApiError::InvalidCredentials("Invalid admin credentials"));
    }

    info!("Admin logged in");
    Ok(SessionUser::Admin { email: admin.email })
}

/// POST /v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Json<SuccessResponse> {
    state.sessions.clear_session(&auth.token);
    info!(role = ?auth.session.role(), "Logged out");
    Json(SuccessResponse::ok())
}

/// GET /v1/auth/session - The caller's session
pub async fn current(auth: Authenticated) -> Json<Session> {
    Json(auth.session)
}

// === Students ===

/// GET /v1/admin/students
pub async fn list_students(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
) -> Json<Vec<StudentSummary>> {
    let students = tenant.store.collection_as::<Student>("students").await;
    Json(
        students
            .iter()
            .map(|r| StudentSummary::new(&r.id, &r.item))
            .collect(),
    )
}

/// POST /v1/admin/students
pub async fn create_student(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Json(mut student): Json<Student>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    student.email = student.email.trim().to_string();
    student.validate(true)?;

    let id = tenant
        .store
        .push_as("students", &student)
        .await
        .ok_or(ApiError::StoreFailure)?;
    info!(student = %id, "Student created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// PUT /v1/admin/students/:id - Blank password keeps the stored one
pub async fn update_student(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path(id): Path<String>,
    Json(mut student): Json<Student>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let path = child_path("students", &id)?;
    let existing = tenant
        .store
        .get_as::<Student>(&path)
        .await
        .ok_or(ApiError::NotFound("Student not found"))?;

    student.email = student.email.trim().to_string();
    student.retain_password(&existing);
    student.validate(false)?;

    ensure_written(tenant.store.set_as(&path, &student).await)?;
    info!(student = %id, "Student updated");
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /v1/admin/students/:id?confirm=true
pub async fn delete_student(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !confirm.confirm {
        return Err(ApiError::ConfirmationRequired(
            "Delete this student? Repeat with confirm=true.",
        ));
    }
    let path = child_path("students", &id)?;
    if tenant.store.get(&path).await.is_none() {
        return Err(ApiError::NotFound("Student not found"));
    }
    ensure_written(tenant.store.delete(&path).await)?;
    info!(student = %id, "Student deleted");
    Ok(Json(SuccessResponse::ok()))
}

// === Admin account ===

/// PUT /v1/admin/credentials - Email required, blank password keeps the old one
pub async fn update_credentials(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let email = req.email.trim();
    if email.is_empty() {
        return Err(ApiError::InvalidInput("email is required".to_string()));
    }

    let existing = tenant
        .store
        .get_as::<AdminCredential>("admin")
        .await
        .unwrap_or_default();
    let updated = AdminCredential {
        email: email.to_string(),
        password: if req.password.is_empty() {
            existing.password
        } else {
            req.password
        },
    };

    ensure_written(tenant.store.set_as("admin", &updated).await)?;
    info!("Admin credentials updated");
    Ok(Json(SuccessResponse::ok()))
}

/// GET /v1/admin/overview - Counts for the admin landing page
pub async fn overview(
    Extension(tenant): Extension<Tenant>,
    _admin: AdminSession,
) -> Json<AdminOverview> {
    Json(collect_overview(&tenant.store).await)
}

pub(crate) async fn collect_overview(store: &Store) -> AdminOverview {
    let students = store.collection_as::<Student>("students").await;
    AdminOverview {
        total_students: students.len(),
        paid_students: students
            .iter()
            .filter(|r| r.item.status == Access::Paid)
            .count(),
        notes: store.count(ContentKind::Notes.path()).await,
        tutes: store.count(ContentKind::Tutorials.path()).await,
        videos: store.count(ContentKind::Videos.path()).await,
        notices: store.count("notices").await,
    }
}
