use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

use crate::shared::error::AnalysisError;

/// Builds the blocking HTTP client shared by both API clients.
///
/// Every request made through it is bounded by `timeout`; an expired request
/// surfaces as [`AnalysisError::Transport`].
pub fn build_client(timeout: Duration) -> Result<Client, AnalysisError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AnalysisError::Config(format!("failed to build HTTP client: {e}")))
}

/// Reads a response body and parses it as JSON, rejecting non-2xx statuses.
pub(crate) fn read_json(
    service: &'static str,
    response: Response,
) -> Result<serde_json::Value, AnalysisError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return decode_body(service, status, &body);
    }
    let body = response
        .text()
        .map_err(|source| AnalysisError::Transport { service, source })?;
    decode_body(service, status, &body)
}

fn decode_body(
    service: &'static str,
    status: StatusCode,
    body: &str,
) -> Result<serde_json::Value, AnalysisError> {
    if !status.is_success() {
        return Err(AnalysisError::protocol(
            service,
            format!("HTTP {}: {}", status.as_u16(), body.trim()),
        ));
    }
    serde_json::from_str(body)
        .map_err(|e| AnalysisError::protocol(service, format!("response is not valid JSON: {e}")))
}
