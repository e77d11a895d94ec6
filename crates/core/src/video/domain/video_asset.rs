use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::shared::error::AnalysisError;

/// A video available on local storage for decoding and upload.
///
/// Assets created by [`VideoAsset::ingest`] live in a temp file that is
/// removed when the asset is dropped. Assets created with
/// [`VideoAsset::from_path`] reference an operator-owned file and never
/// delete it.
#[derive(Debug)]
pub struct VideoAsset {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl VideoAsset {
    /// Persists uploaded video bytes to a temp file with the given extension.
    pub fn ingest(bytes: &[u8], extension: &str) -> Result<Self, AnalysisError> {
        Self::ingest_reader(&mut io::Cursor::new(bytes), extension)
    }

    /// Streams a video from `reader` into a temp file with the given extension.
    pub fn ingest_reader(reader: &mut dyn Read, extension: &str) -> Result<Self, AnalysisError> {
        let temp_dir = std::env::temp_dir();
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let mut file = tempfile::Builder::new()
            .prefix("plate-scan-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| AnalysisError::io(&temp_dir, e))?;

        io::copy(reader, &mut file).map_err(|e| AnalysisError::io(file.path(), e))?;
        file.flush().map_err(|e| AnalysisError::io(file.path(), e))?;

        let temp = file.into_temp_path();
        log::debug!("Ingested video to {}", temp.display());
        Ok(Self {
            path: temp.to_path_buf(),
            temp: Some(temp),
        })
    }

    /// References an existing video file without copying it.
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        if !path.is_file() {
            return Err(AnalysisError::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "video file not found"),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            temp: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}
