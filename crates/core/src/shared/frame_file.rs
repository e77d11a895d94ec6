use std::path::PathBuf;

/// A decoded frame that has been written to disk for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameFile {
    pub index: usize,
    pub path: PathBuf,
}
