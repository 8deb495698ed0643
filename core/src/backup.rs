//! Backup document shape.
//!
//! A backup is one JSON object holding each top-level collection or
//! singleton verbatim, plus the export time. Import overwrites every key
//! present in the document and leaves absent keys alone; record shapes
//! are not validated.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collections cleared by a tenant reset. Branding and credentials stay.
pub const RESET_PATHS: [&str; 5] = ["students", "notes", "tutes", "videos", "notices"];

/// A tenant backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    /// Admin credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Value>,
    /// Branding settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<Value>,
    /// Students collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<Value>,
    /// Notes collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
    /// Tutorials collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutes: Option<Value>,
    /// Tutorials under their older key. Read on import when `tutes` is
    /// absent; never written.
    #[serde(default, skip_serializing)]
    pub tutorials: Option<Value>,
    /// Videos collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Value>,
    /// Notices collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notices: Option<Value>,
    /// RFC 3339 export time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<String>,
}

impl BackupDocument {
    /// Stamp the export time.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.export_date = Some(now.to_rfc3339_opts(SecondsFormat::Millis, true));
        self
    }

    /// Keys present in the document with their store paths, in restore order.
    /// `null` counts as absent.
    pub fn entries(&self) -> Vec<(&'static str, &Value)> {
        fn present(value: &Option<Value>) -> Option<&Value> {
            value.as_ref().filter(|v| !v.is_null())
        }

        [
            ("admin", present(&self.admin)),
            ("branding", present(&self.branding)),
            ("students", present(&self.students)),
            ("notes", present(&self.notes)),
            ("tutes", present(&self.tutes).or(present(&self.tutorials))),
            ("videos", present(&self.videos)),
            ("notices", present(&self.notices)),
        ]
        .into_iter()
        .filter_map(|(path, value)| value.map(|value| (path, value)))
        .collect()
    }

    /// Set a key by store path. Unknown paths are ignored.
    pub fn insert(&mut self, path: &str, value: Option<Value>) {
        let slot = match path {
            "admin" => &mut self.admin,
            "branding" => &mut self.branding,
            "students" => &mut self.students,
            "notes" => &mut self.notes,
            "tutes" => &mut self.tutes,
            "tutorials" => &mut self.tutorials,
            "videos" => &mut self.videos,
            "notices" => &mut self.notices,
            _ => return,
        };
        *slot = value;
    }
}

/// Store paths a backup covers.
pub const BACKUP_PATHS: [&str; 7] = [
    "admin", "branding", "students", "notes", "tutes", "videos", "notices",
];

/// Download file name for a backup taken at `now`.
pub fn backup_filename(now: DateTime<Utc>) -> String {
    format!("backup_{}.json", now.format("%Y-%m-%d"))
}

/// Download file name for a super-admin full export.
pub fn full_backup_filename(now: DateTime<Utc>) -> String {
    format!("full-backup-{}.json", now.format("%Y-%m-%d"))
}
