//! Student accounts and the tenant admin credential.

use crate::calendar;
use crate::content::Access;
use crate::error::{Error, Result};
use crate::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default tenant admin email, seeded when no credential exists.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@admin.com";

/// Default tenant admin password.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// A student account as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Login email.
    #[serde(default)]
    pub email: String,
    /// Plaintext password.
    #[serde(default)]
    pub password: String,
    /// Contact number.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    /// Subscription tier as stored.
    #[serde(default)]
    pub status: Access,
    /// Paid access end date (`YYYY-MM-DD`).
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<String>,
}

impl Student {
    /// True when a paid subscription has passed its expiry date.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == Access::Paid
            && self
                .expiry
                .as_deref()
                .is_some_and(|expiry| calendar::is_past(expiry, now))
    }

    /// Status after the expiry rule is applied.
    pub fn effective_status(&self, now: DateTime<Utc>) -> Access {
        if self.is_expired(now) {
            Access::Free
        } else {
            self.status
        }
    }

    /// Exact plaintext comparison.
    pub fn matches(&self, email: &str, password: &str) -> bool {
        self.email == email && self.password == password
    }

    /// Check required fields. Passwords are only required on create.
    pub fn validate(&self, creating: bool) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingField { field: "name" });
        }
        if self.email.trim().is_empty() {
            return Err(Error::MissingField { field: "email" });
        }
        if creating && self.password.is_empty() {
            return Err(Error::MissingField { field: "password" });
        }
        if let Some(expiry) = &self.expiry {
            calendar::parse_date(expiry)?;
        }
        Ok(())
    }

    /// Keep the stored password when an edit leaves it blank.
    pub fn retain_password(&mut self, existing: &Student) {
        if self.password.is_empty() {
            self.password = existing.password.clone();
        }
    }
}

/// Student listing entry without the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    /// Record ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Contact number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Stored status.
    pub status: Access,
    /// "Paid" or "Free".
    pub status_label: &'static str,
    /// Expiry date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

impl StudentSummary {
    /// Summarise a stored student.
    pub fn new(id: &str, student: &Student) -> Self {
        Self {
            id: id.to_string(),
            name: student.name.clone(),
            email: student.email.clone(),
            phone: student.phone.clone(),
            status: student.status,
            status_label: student.status.label(),
            expiry: student.expiry.clone(),
        }
    }
}

/// The tenant admin's login, a singleton at `admin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredential {
    /// Login email.
    #[serde(default)]
    pub email: String,
    /// Plaintext password.
    #[serde(default)]
    pub password: String,
}

impl Default for AdminCredential {
    fn default() -> Self {
        Self {
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl AdminCredential {
    /// Exact plaintext comparison.
    pub fn matches(&self, email: &str, password: &str) -> bool {
        self.email == email && self.password == password
    }
}
