//! Tenant licenses, feature restrictions and the access gate.
//!
//! A license lives at `superAdmin/licenses/<CODE>`; the tenant's own data
//! lives under `superAdmin/licenses/<CODE>/data`. [`evaluate`] decides
//! whether a tenant may boot, first match wins:
//!
//! | condition | decision |
//! |---|---|
//! | record missing | [`GateDecision::NotFound`] |
//! | suspended | [`GateDecision::Suspended`] |
//! | expiry in the past | [`GateDecision::Expired`] |
//! | `siteEnabled == false` | [`GateDecision::Maintenance`] |
//! | otherwise | [`GateDecision::Open`] |

use crate::calendar;
use crate::content::ContentKind;
use crate::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved store root for the super-admin layer. Never tenant-prefixed.
pub const SUPER_ADMIN_ROOT: &str = "superAdmin";

const DEFAULT_MAINTENANCE_MESSAGE: &str = "Site is under maintenance. Please try again later.";

/// Store path of a tenant's data subtree.
pub fn tenant_data_prefix(code: &str) -> String {
    format!("{}/licenses/{}/data", SUPER_ADMIN_ROOT, code)
}

/// Store path of a license record.
pub fn license_path(code: &str) -> String {
    format!("{}/licenses/{}", SUPER_ADMIN_ROOT, code)
}

/// Store path of the super-admin notices addressed to a tenant.
pub fn tenant_notices_path(code: &str) -> String {
    format!("{}/superAdminNotices", license_path(code))
}

/// Normalise an activation code as typed by a user.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn enabled() -> bool {
    true
}

/// License lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Usable.
    #[default]
    Active,
    /// Blocked by the super admin.
    Suspended,
}

/// Student-side navigation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFeatures {
    /// Notes section.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub notes: bool,
    /// Tutorials section.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub tutes: bool,
    /// Videos section.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub videos: bool,
}

impl Default for StudentFeatures {
    fn default() -> Self {
        Self {
            notes: true,
            tutes: true,
            videos: true,
        }
    }
}

impl StudentFeatures {
    /// Whether a content section is shown.
    pub fn shows(&self, kind: ContentKind) -> bool {
        match kind {
            ContentKind::Notes => self.notes,
            ContentKind::Tutorials => self.tutes,
            ContentKind::Videos => self.videos,
        }
    }
}

/// Admin-side navigation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminFeatures {
    /// Notes management.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub notes: bool,
    /// Tutorials management.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub tutes: bool,
    /// Videos management.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub videos: bool,
    /// Student directory.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub students: bool,
    /// Notice board.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub notices: bool,
    /// Branding settings.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub branding: bool,
}

impl Default for AdminFeatures {
    fn default() -> Self {
        Self {
            notes: true,
            tutes: true,
            videos: true,
            students: true,
            notices: true,
            branding: true,
        }
    }
}

/// Feature and maintenance restrictions, global or per license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restrictions {
    /// Only an explicit `false` takes the site down.
    #[serde(default = "enabled", deserialize_with = "lenient::enabled_unless_false")]
    pub site_enabled: bool,
    /// Maintenance screen heading.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub maintenance_title: Option<String>,
    /// Maintenance screen body.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub maintenance_message: Option<String>,
    /// Student navigation.
    #[serde(default)]
    pub student_features: StudentFeatures,
    /// Admin navigation.
    #[serde(default)]
    pub admin_features: AdminFeatures,
    /// Per-notice override; only `false` hides a notice.
    #[serde(default)]
    pub notice_restrictions: BTreeMap<String, bool>,
}

impl Default for Restrictions {
    fn default() -> Self {
        Self {
            site_enabled: true,
            maintenance_title: None,
            maintenance_message: Some(DEFAULT_MAINTENANCE_MESSAGE.to_string()),
            student_features: StudentFeatures::default(),
            admin_features: AdminFeatures::default(),
            notice_restrictions: BTreeMap::new(),
        }
    }
}

/// A tenant license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct License {
    /// Optional label for the super-admin listing.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub status: LicenseStatus,
    /// Last valid date.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<String>,
    /// Tenant restrictions.
    #[serde(default)]
    pub restrictions: Restrictions,
}

impl License {
    /// True when an expiry is set and has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .as_deref()
            .is_some_and(|expiry| calendar::is_past(expiry, now))
    }
}

/// A blocking screen shown instead of the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    /// Heading.
    pub title: String,
    /// Body.
    pub message: String,
}

/// Outcome of evaluating a tenant license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Boot normally with these restrictions.
    Open(Restrictions),
    /// No license record for the code.
    NotFound,
    /// License suspended.
    Suspended(Screen),
    /// License past its expiry.
    Expired(Screen),
    /// Site switched off.
    Maintenance(Screen),
}

impl GateDecision {
    /// True when the portal may run.
    pub fn is_open(&self) -> bool {
        matches!(self, GateDecision::Open(_))
    }
}

fn screen(restrictions: &Restrictions, title: &str, message: &str) -> Screen {
    Screen {
        title: restrictions
            .maintenance_title
            .clone()
            .unwrap_or_else(|| title.to_string()),
        message: restrictions
            .maintenance_message
            .clone()
            .unwrap_or_else(|| message.to_string()),
    }
}

fn expired_screen() -> Screen {
    Screen {
        title: "License Expired".to_string(),
        message: "Your license has expired. Please contact the administrator to renew.".to_string(),
    }
}

/// Apply the gate decision table to a fetched license.
pub fn evaluate(license: Option<&License>, now: DateTime<Utc>) -> GateDecision {
    let Some(license) = license else {
        return GateDecision::NotFound;
    };
    let restrictions = &license.restrictions;
    if license.status == LicenseStatus::Suspended {
        return GateDecision::Suspended(screen(
            restrictions,
            "Access Suspended",
            "Your access has been suspended. Please contact support.",
        ));
    }
    if license.is_expired(now) {
        return GateDecision::Expired(expired_screen());
    }
    evaluate_global(restrictions)
}

/// Gate for a single-tenant deployment, driven by global restrictions only.
pub fn evaluate_global(restrictions: &Restrictions) -> GateDecision {
    if !restrictions.site_enabled {
        return GateDecision::Maintenance(screen(
            restrictions,
            "Site Unavailable",
            "This site is temporarily unavailable.",
        ));
    }
    GateDecision::Open(restrictions.clone())
}

/// Why an activation code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationError {
    /// No license with this code.
    Unknown,
    /// License suspended.
    Suspended,
    /// License expired.
    Expired,
}

impl ActivationError {
    /// Message shown under the activation form.
    pub fn message(self) -> &'static str {
        match self {
            ActivationError::Unknown => "Invalid license code. Please check and try again.",
            ActivationError::Suspended => "This license has been suspended. Contact support.",
            ActivationError::Expired => "This license has expired. Contact support to renew.",
        }
    }
}

/// Check an activation attempt. The site switch is not consulted here.
pub fn validate_activation(
    license: Option<&License>,
    now: DateTime<Utc>,
) -> Result<(), ActivationError> {
    let license = license.ok_or(ActivationError::Unknown)?;
    if license.status == LicenseStatus::Suspended {
        return Err(ActivationError::Suspended);
    }
    if license.is_expired(now) {
        return Err(ActivationError::Expired);
    }
    Ok(())
}

/// A navigation entry on a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEntry {
    /// Section key.
    pub section: &'static str,
    /// Label.
    pub label: &'static str,
}

const fn nav(section: &'static str, label: &'static str) -> NavEntry {
    NavEntry { section, label }
}

/// Student navigation after applying feature flags.
pub fn student_nav(features: &StudentFeatures) -> Vec<NavEntry> {
    let mut entries = vec![nav("dashboard", "Dashboard")];
    if features.notes {
        entries.push(nav("notes", "Notes"));
    }
    if features.tutes {
        entries.push(nav("tutes", "Tutes"));
    }
    if features.videos {
        entries.push(nav("videos", "Videos"));
    }
    entries
}

/// Admin navigation after applying feature flags.
pub fn admin_nav(features: &AdminFeatures) -> Vec<NavEntry> {
    let flagged = [
        (features.notes, nav("notes", "Notes")),
        (features.tutes, nav("tutes", "Tutes")),
        (features.videos, nav("videos", "Videos")),
        (features.students, nav("students", "Students")),
        (features.notices, nav("notices", "Notices")),
        (features.branding, nav("branding", "Branding")),
    ];
    let mut entries = vec![nav("overview", "Overview")];
    entries.extend(flagged.into_iter().filter(|(on, _)| *on).map(|(_, e)| e));
    entries.push(nav("backup", "Backup"));
    entries.push(nav("settings", "Settings"));
    entries
}

/// Severity of a super-admin message to a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantNoticePriority {
    /// Informational.
    #[default]
    Info,
    /// Warning.
    Warning,
    /// Critical.
    Critical,
}

/// A message from the super admin to one tenant's admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantNotice {
    /// Heading.
    #[serde(default)]
    pub title: String,
    /// Body.
    #[serde(default)]
    pub message: String,
    /// Severity.
    #[serde(default)]
    pub priority: TenantNoticePriority,
    /// Dismissed by the tenant admin.
    #[serde(default, deserialize_with = "lenient::bool_or_string")]
    pub read: bool,
    /// Send time in epoch milliseconds.
    #[serde(
        default,
        deserialize_with = "lenient::epoch_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<i64>,
}
