//! Configuration for the portal backend.
//!
//! All configuration is loaded from environment variables.
//! No credentials are logged.

use std::path::PathBuf;
use std::time::Duration;

/// Where the key-value namespace is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// In-process map; lost on restart.
    Memory,
    /// One JSON file per top-level key under `data_dir`.
    File,
}

/// Deployment shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tenancy {
    /// One portal at the namespace root, no activation.
    Single,
    /// Licensed tenants, each under its own data subtree.
    Multi,
}

impl Tenancy {
    pub fn label(self) -> &'static str {
        match self {
            Tenancy::Single => "single",
            Tenancy::Multi => "multi",
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,

    /// Server port
    pub port: u16,

    // === Storage ===
    /// Backend for the key-value namespace
    pub storage: StorageKind,

    /// Directory for the file backend and local state
    pub data_dir: PathBuf,

    /// Single- or multi-tenant gate
    pub tenancy: Tenancy,

    // === Sessions ===
    /// Student and admin session lifetime (default: 24 hours)
    pub session_ttl: Duration,

    /// Super-admin session lifetime (default: 4 hours)
    pub super_admin_session_ttl: Duration,

    /// Expired session sweep interval (default: 60 seconds)
    pub cleanup_interval: Duration,

    // === Limits ===
    /// Maximum request body in bytes (default: 64 MiB)
    pub max_upload_bytes: usize,

    /// Maximum decoded video upload in bytes (default: 50 MiB)
    pub video_upload_limit: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 8080),

            storage: match std::env::var("STORAGE").as_deref() {
                Ok("file") => StorageKind::File,
                _ => StorageKind::Memory,
            },
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            tenancy: match std::env::var("TENANCY").as_deref() {
                Ok("multi") => Tenancy::Multi,
                _ => Tenancy::Single,
            },

            session_ttl: Duration::from_secs(env_or("SESSION_TTL_SECS", 24 * 3600)),
            super_admin_session_ttl: Duration::from_secs(env_or(
                "SUPER_ADMIN_SESSION_TTL_SECS",
                4 * 3600,
            )),
            cleanup_interval: Duration::from_secs(env_or("CLEANUP_INTERVAL_SECS", 60)),

            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 64 * 1024 * 1024),
            video_upload_limit: env_or(
                "VIDEO_UPLOAD_LIMIT_BYTES",
                portal_core::content::VIDEO_UPLOAD_LIMIT,
            ),
        }
    }

    /// In-memory, single-tenant configuration with default limits.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageKind::Memory,
            tenancy: Tenancy::Single,
            ..Self::from_env()
        }
    }

    /// Path of the local state file (activation code, theme).
    pub fn local_state_path(&self) -> PathBuf {
        self.data_dir.join("local_state.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_is_single_tenant() {
        let config = Config::in_memory();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.tenancy, Tenancy::Single);
        assert!(config.local_state_path().ends_with("local_state.json"));
    }
}
