//! Device-local state: the cached activation code and the UI theme.
//!
//! Kept apart from the shared namespace so a full import or reset never
//! touches it. Persisted to a small JSON file when a path is given.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Colour theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other theme
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_license: Option<String>,
    #[serde(default)]
    theme: Theme,
}

/// Local persisted state
pub struct LocalState {
    path: Option<PathBuf>,
    data: RwLock<LocalData>,
}

impl LocalState {
    /// State that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(LocalData::default()),
        }
    }

    /// Load from `path`, starting empty if the file is missing or unreadable.
    pub async fn load(path: PathBuf) -> Self {
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable local state");
                LocalData::default()
            }),
            Err(_) => LocalData::default(),
        };
        Self {
            path: Some(path),
            data: RwLock::new(data),
        }
    }

    /// Cached activation code
    pub async fn active_license(&self) -> Option<String> {
        self.data.read().await.active_license.clone()
    }

    /// Cache or clear the activation code
    pub async fn set_active_license(&self, code: Option<String>) {
        let mut data = self.data.write().await;
        data.active_license = code;
        self.persist(&data).await;
    }

    /// Current theme
    pub async fn theme(&self) -> Theme {
        self.data.read().await.theme
    }

    /// Set the theme
    pub async fn set_theme(&self, theme: Theme) -> Theme {
        let mut data = self.data.write().await;
        data.theme = theme;
        self.persist(&data).await;
        theme
    }

    /// Flip the theme and return the new one
    pub async fn toggle_theme(&self) -> Theme {
        let mut data = self.data.write().await;
        data.theme = data.theme.toggled();
        self.persist(&data).await;
        data.theme
    }

    async fn persist(&self, data: &LocalData) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(error = %e, "Failed to create local state directory");
                return;
            }
        }
        let result = match serde_json::to_vec(data) {
            Ok(bytes) => tokio::fs::write(path, bytes).await,
            Err(e) => Err(std::io::Error::other(e)),
        };
        match result {
            Ok(()) => debug!("Local state saved"),
            Err(e) => warn!(error = %e, "Failed to save local state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn theme_toggles() {
        let state = LocalState::in_memory();
        assert_eq!(state.theme().await, Theme::Light);
        assert_eq!(state.toggle_theme().await, Theme::Dark);
        assert_eq!(state.toggle_theme().await, Theme::Light);
    }

    #[tokio::test]
    async fn activation_code_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local_state.json");

        let state = LocalState::load(path.clone()).await;
        state.set_active_license(Some("ABC123".into())).await;
        state.set_theme(Theme::Dark).await;

        let reloaded = LocalState::load(path).await;
        assert_eq!(reloaded.active_license().await.as_deref(), Some("ABC123"));
        assert_eq!(reloaded.theme().await, Theme::Dark);
    }
}
