use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregation::result_table::FillMode;
use crate::shared::constants::{DEFAULT_REGIONS, DEFAULT_TIMEOUT_SECS};
use crate::shared::error::AnalysisError;

/// Persisted analysis preferences. Missing fields fall back to defaults so
/// older settings files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Region hints sent with every plate request.
    pub regions: Vec<String>,
    pub timeout_secs: u64,
    pub fill_mode: FillMode,
    /// Keep the per-run frame directory instead of deleting it.
    pub keep_frames: bool,
    /// Directory for the last raw API responses; auditing is off when unset.
    pub audit_dir: Option<PathBuf>,
    pub work_root: Option<PathBuf>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fill_mode: FillMode::default(),
            keep_frames: false,
            audit_dir: None,
            work_root: None,
        }
    }
}

impl AnalysisSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Plate Scan").join("settings.json"))
    }

    /// Loads settings from the platform config path, using defaults when the
    /// file is absent or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("Ignoring settings file: {e}");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, AnalysisError> {
        let json = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        let settings: Self = serde_json::from_str(&json)
            .map_err(|e| AnalysisError::Config(format!("{}: {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AnalysisError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::Config(format!("failed to serialize settings: {e}")))?;
        fs::write(path, json).map_err(|e| AnalysisError::io(path, e))
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.timeout_secs == 0 {
            return Err(AnalysisError::Config(
                "timeout must be at least 1 second".into(),
            ));
        }
        if self.regions.iter().any(|r| r.trim().is_empty()) {
            return Err(AnalysisError::Config("regions must not be blank".into()));
        }
        Ok(())
    }

    /// Root under which per-run working directories are created.
    pub fn work_root(&self) -> PathBuf {
        self.work_root.clone().unwrap_or_else(default_work_root)
    }
}

/// Platform cache directory for run workspaces, falling back to the system
/// temp directory.
pub fn default_work_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("Plate Scan")
        .join("runs")
}
