use reqwest::blocking::multipart::Form;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;

use crate::recognition::domain::plate_reader::PlateReader;
use crate::shared::constants::{PLATE_ENDPOINT, PLATE_SERVICE};
use crate::shared::error::AnalysisError;
use crate::shared::frame_file::FrameFile;
use crate::shared::http::read_json;

/// Plate Recognizer snapshot API client.
///
/// Each call uploads one frame as the `upload` part together with one
/// `regions` field per region hint, authenticated with `Token <key>`.
pub struct PlateRecognizerClient {
    client: Client,
    endpoint: String,
    api_key: String,
    regions: Vec<String>,
}

impl PlateRecognizerClient {
    pub fn new(client: Client, api_key: impl Into<String>, regions: Vec<String>) -> Self {
        Self {
            client,
            endpoint: PLATE_ENDPOINT.to_string(),
            api_key: api_key.into(),
            regions,
        }
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    fn form(&self, frame: &FrameFile) -> Result<Form, AnalysisError> {
        let form = self
            .regions
            .iter()
            .fold(Form::new(), |form, region| form.text("regions", region.clone()));
        form.file("upload", &frame.path)
            .map_err(|e| AnalysisError::io(&frame.path, e))
    }
}

impl PlateReader for PlateRecognizerClient {
    fn read(&mut self, frame: &FrameFile) -> Result<serde_json::Value, AnalysisError> {
        let form = self.form(frame)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .multipart(form)
            .send()
            .map_err(|source| AnalysisError::Transport {
                service: PLATE_SERVICE,
                source,
            })?;

        read_json(PLATE_SERVICE, response)
    }
}
