use serde_json::Value;

use crate::shared::constants::PLATE_SERVICE;
use crate::shared::error::AnalysisError;

/// Returns the `plate` string of every entry in the response's `results`,
/// in response order. An empty `results` list is valid.
pub fn plates_in_response(response: &Value) -> Result<Vec<String>, AnalysisError> {
    let results = response
        .get("results")
        .ok_or_else(|| AnalysisError::protocol(PLATE_SERVICE, "response has no `results`"))?
        .as_array()
        .ok_or_else(|| AnalysisError::protocol(PLATE_SERVICE, "`results` is not a list"))?;

    results
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .get("plate")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    AnalysisError::protocol(
                        PLATE_SERVICE,
                        format!("result {i} has no string `plate`"),
                    )
                })
        })
        .collect()
}
