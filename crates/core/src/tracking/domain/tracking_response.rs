use serde_json::Value;

use crate::shared::constants::TRACKING_SERVICE;
use crate::shared::error::AnalysisError;

/// Extracts the `public_id` job identifier from a tracking response.
pub fn tracking_job_id(response: &Value) -> Result<String, AnalysisError> {
    match response.get("public_id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::String(_)) => Err(AnalysisError::protocol(
            TRACKING_SERVICE,
            "`public_id` is empty",
        )),
        Some(other) => Err(AnalysisError::protocol(
            TRACKING_SERVICE,
            format!("`public_id` is not a string: {other}"),
        )),
        None => Err(AnalysisError::protocol(
            TRACKING_SERVICE,
            "response has no `public_id`",
        )),
    }
}
