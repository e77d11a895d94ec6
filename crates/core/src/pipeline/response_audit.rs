use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::{PLATE_RESPONSE_FILE, TRACKING_RESPONSE_FILE};

/// Keeps the most recent raw response of each API on disk for inspection.
///
/// Files are overwritten on every call. Write failures are logged and never
/// interrupt the analysis.
pub struct ResponseAudit {
    dir: PathBuf,
}

impl ResponseAudit {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn tracking_path(&self) -> PathBuf {
        self.dir.join(TRACKING_RESPONSE_FILE)
    }

    pub fn plates_path(&self) -> PathBuf {
        self.dir.join(PLATE_RESPONSE_FILE)
    }

    pub fn record_tracking(&self, response: &serde_json::Value) {
        self.record(&self.tracking_path(), response);
    }

    pub fn record_plates(&self, response: &serde_json::Value) {
        self.record(&self.plates_path(), response);
    }

    fn record(&self, path: &Path, response: &serde_json::Value) {
        let result = fs::create_dir_all(&self.dir)
            .and_then(|_| serde_json::to_string_pretty(response).map_err(std::io::Error::other))
            .and_then(|json| fs::write(path, json));
        if let Err(e) = result {
            log::warn!("Could not write response audit {}: {e}", path.display());
        }
    }
}
