use crate::shared::error::AnalysisError;
use crate::video::domain::video_asset::VideoAsset;

/// Submits a whole video to a remote person-tracking service.
///
/// Returns the raw JSON body so callers can audit it before extracting the
/// job identifier with [`super::tracking_response::tracking_job_id`].
pub trait PersonTracker: Send {
    fn submit(&mut self, video: &VideoAsset) -> Result<serde_json::Value, AnalysisError>;
}
