//! Request and response bodies for the portal API.
//!
//! Stored records (notes, students, notices, licenses...) are the
//! `portal_core` types themselves; this module only holds the envelopes
//! around them.

use crate::local_state::Theme;
use portal_core::license::{NavEntry, TenantNotice};
use portal_core::{
    Access, BrandingSettings, ContentCard, License, Notice, Restrictions, Screen, TeacherInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Generic
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    /// Gate screen to render instead of the portal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<Screen>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// `?confirm=true` on destructive deletes
#[derive(Debug, Deserialize, Default)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

// ============================================================================
// Gate, activation, theme
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResponse {
    /// `open`, `activationRequired` or `closed`
    pub state: &'static str,
    pub tenancy: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<Screen>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemeBody {
    pub theme: Theme,
}

/// `PUT /v1/theme`: set an explicit theme, or toggle when omitted
#[derive(Debug, Deserialize, Default)]
pub struct ThemeRequest {
    #[serde(default)]
    pub theme: Option<Theme>,
}

// ============================================================================
// Sessions
// ============================================================================

/// Which login form was used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoginRole {
    #[default]
    Student,
    Admin,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: LoginRole,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub session: crate::auth::Session,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingResponse {
    #[serde(flatten)]
    pub settings: BrandingSettings,
    /// Info bar; absent when no teacher details are set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_info: Option<TeacherInfo>,
}

// ============================================================================
// Dashboards
// ============================================================================

/// Per-kind count of items a student can open
#[derive(Debug, Default, Serialize)]
pub struct ContentStats {
    pub notes: usize,
    pub tutes: usize,
    pub videos: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub role: crate::auth::Role,
    pub nav: Vec<NavEntry>,
    pub site_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_info: Option<TeacherInfo>,
    /// Student only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ContentStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Access>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub total_students: usize,
    pub paid_students: usize,
    pub notes: usize,
    pub tutes: usize,
    pub videos: usize,
    pub notices: usize,
}

// ============================================================================
// Content
// ============================================================================

/// Listing filters; `all` or empty disables a filter
#[derive(Debug, Deserialize, Default)]
pub struct ContentQuery {
    pub access: Option<String>,
    pub month: Option<String>,
    #[serde(rename = "type")]
    pub tutorial_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContentListResponse {
    pub items: Vec<ContentCard>,
    /// Months available for the month filter, newest first
    pub months: Vec<String>,
    pub total: usize,
}

/// Notice as the super admin sees it, with the override applied
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperNoticeView {
    pub id: String,
    #[serde(flatten)]
    pub notice: Notice,
    /// False when switched off by the notice restrictions
    pub enabled: bool,
}

// ============================================================================
// Directory
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// ============================================================================
// Backup, reset, uploads
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub confirm: bool,
    pub document: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub confirm_again: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct UploadQuery {
    #[serde(default)]
    pub kind: crate::media::UploadKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub data_uri: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// Keys overwritten by the import
    pub restored: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct LogoRequest {
    #[serde(default)]
    pub logo: String,
}

// ============================================================================
// Super admin
// ============================================================================

pub const DEFAULT_SUPER_ADMIN_KEY: &str = "superadmin@dev.com";
pub const DEFAULT_SUPER_ADMIN_CODE: &str = "SuperAdmin@2024!";

/// Stored at `superAdmin/credentials`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperAdminCredentials {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub security_code: String,
}

impl Default for SuperAdminCredentials {
    fn default() -> Self {
        Self {
            access_key: DEFAULT_SUPER_ADMIN_KEY.to_string(),
            security_code: DEFAULT_SUPER_ADMIN_CODE.to_string(),
        }
    }
}

impl SuperAdminCredentials {
    pub fn matches(&self, access_key: &str, security_code: &str) -> bool {
        self.access_key == access_key && self.security_code == security_code
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperLoginRequest {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub security_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperCredentialsRequest {
    #[serde(default)]
    pub current_key: String,
    #[serde(default)]
    pub current_code: String,
    #[serde(default)]
    pub new_key: String,
    #[serde(default)]
    pub new_code: String,
}

/// `?license=CODE` selects a tenant; absent means the namespace root
#[derive(Debug, Deserialize, Default)]
pub struct LicenseScopeQuery {
    pub license: Option<String>,
}

/// Site switch, globally or for one license
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatusRequest {
    pub site_enabled: bool,
    #[serde(default)]
    pub maintenance_title: Option<String>,
    #[serde(default)]
    pub maintenance_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeToggleRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseView {
    pub code: String,
    #[serde(flatten)]
    pub license: License,
    pub expired: bool,
    /// Whether the tenant has stored any data yet
    pub has_data: bool,
}

/// Create a license; the code is normalised like an activation code
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseCreateRequest {
    pub code: String,
    #[serde(flatten)]
    pub license: License,
}

/// Partial license edit; absent fields are left alone
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LicenseUpdateRequest {
    pub name: Option<String>,
    pub status: Option<portal_core::LicenseStatus>,
    /// Empty string clears the expiry
    pub expiry: Option<String>,
    pub restrictions: Option<Restrictions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantNoticeView {
    pub id: String,
    #[serde(flatten)]
    pub notice: TenantNotice,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperImportRequest {
    #[serde(default)]
    pub confirm: bool,
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SuperResetRequest {
    #[serde(default)]
    pub confirmation: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    pub total_students: usize,
    pub paid_students: usize,
    pub notes: usize,
    pub tutes: usize,
    pub videos: usize,
    pub notices: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licenses: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_role_defaults_to_student() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"p"}"#).unwrap();
        assert_eq!(req.role, LoginRole::Student);
    }

    #[test]
    fn error_response_omits_empty_screen() {
        let body = ErrorResponse {
            error: "not found".into(),
            code: "NOT_FOUND",
            screen: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("screen").is_none());
    }

    #[test]
    fn super_credentials_defaults() {
        let creds = SuperAdminCredentials::default();
        assert!(creds.matches("superadmin@dev.com", "SuperAdmin@2024!"));
        assert!(!creds.matches("superadmin@dev.com", "wrong"));
    }

    #[test]
    fn license_update_is_partial() {
        let req: LicenseUpdateRequest = serde_json::from_str(r#"{"status":"suspended"}"#).unwrap();
        assert_eq!(req.status, Some(portal_core::LicenseStatus::Suspended));
        assert!(req.restrictions.is_none());
    }
}
