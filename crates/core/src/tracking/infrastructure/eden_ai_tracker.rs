use reqwest::blocking::multipart::Form;
use reqwest::blocking::Client;

use crate::shared::constants::{TRACKING_ENDPOINT, TRACKING_PROVIDER, TRACKING_SERVICE};
use crate::shared::error::AnalysisError;
use crate::shared::http::read_json;
use crate::tracking::domain::person_tracker::PersonTracker;
use crate::video::domain::video_asset::VideoAsset;

/// Eden AI asynchronous person-tracking client.
///
/// One multipart `POST` per video: `file` carries the video bytes and
/// `providers` selects the backing vendor. Authenticates with a bearer token.
pub struct EdenAiTracker {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl EdenAiTracker {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: TRACKING_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

impl PersonTracker for EdenAiTracker {
    fn submit(&mut self, video: &VideoAsset) -> Result<serde_json::Value, AnalysisError> {
        let form = Form::new()
            .text("providers", TRACKING_PROVIDER)
            .file("file", video.path())
            .map_err(|e| AnalysisError::io(video.path(), e))?;

        log::debug!("Uploading {} to {}", video.path().display(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|source| AnalysisError::Transport {
                service: TRACKING_SERVICE,
                source,
            })?;

        read_json(TRACKING_SERVICE, response)
    }
}
