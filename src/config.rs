//! Organizer Configuration
//!
//! Persisted as `organizer_config.json` next to the application data.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "organizer_config.json";
pub const BASE_URL_ENV: &str = "ORGANIZER_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Root of the organizer API
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Log directory. Logging is disabled when absent.
    pub log_dir: Option<PathBuf>,
    pub app_name: String,
    /// Bound on cascading auto-expansion during refresh
    pub max_expand_depth: usize,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
            log_dir: None,
            app_name: "ProjectOrganizer".to_string(),
            max_expand_depth: 16,
        }
    }
}

impl OrganizerConfig {
    /// Read the config file. Missing or malformed files yield None.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }

    /// Apply `ORGANIZER_BASE_URL` when set and non-empty
    pub fn with_env_overrides(self) -> Self {
        self.with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        self
    }
}
