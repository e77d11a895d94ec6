use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::shared::error::AnalysisError;

/// Per-run working directory for frame files.
///
/// Each run gets its own `run-*` directory under the work root so concurrent
/// invocations never overwrite each other's frames. The directory is removed
/// on drop unless kept.
#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
    keep: bool,
}

impl RunWorkspace {
    pub fn create(root: &Path, keep: bool) -> Result<Self, AnalysisError> {
        fs::create_dir_all(root).map_err(|e| AnalysisError::io(root, e))?;
        let dir = tempfile::Builder::new()
            .prefix("run-")
            .keep(keep)
            .tempdir_in(root)
            .map_err(|e| AnalysisError::io(root, e))?;
        log::debug!("Created run workspace {}", dir.path().display());
        Ok(Self { dir, keep })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.dir.path().join("frames")
    }

    pub fn is_kept(&self) -> bool {
        self.keep
    }
}
