use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// A field was present but had the wrong type or an impossible value.
    #[error("Malformed payload at '{field}': {reason}")]
    MalformedPayload { field: String, reason: String },

    #[error("Error in calculation: {0}")]
    Calculation(String),
}

impl AnalyticsError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalyticsError::MalformedPayload {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
