use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommissionError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CommissionError {
    fn from(e: serde_json::Error) -> Self {
        CommissionError::SerializationError(e.to_string())
    }
}
