use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the simulator on non-success responses,
/// e.g. `{"detail": "Session not found"}`. Validation failures carry a
/// structured `detail` array instead of a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: Value,
}

impl ApiErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
