use crate::shared::error::AnalysisError;
use crate::shared::frame_file::FrameFile;

/// Sends one frame image to a remote plate-recognition service.
///
/// Takes `&mut self` so implementations may keep per-run state. The raw
/// JSON body is returned for auditing; plates are pulled out with
/// [`super::plate_response::plates_in_response`].
pub trait PlateReader: Send {
    fn read(&mut self, frame: &FrameFile) -> Result<serde_json::Value, AnalysisError>;
}
