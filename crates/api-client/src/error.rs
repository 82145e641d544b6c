use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Live mode without the credentials it needs. Retrying will not help.
    #[error("Etsy client is not configured: {0}")]
    NotConfigured(String),

    /// The request itself is unusable (e.g. an empty shop id).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Etsy rejected the token and a refresh did not fix it.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited by Etsy; gave up after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Etsy returned server error {status}; gave up after {attempts} attempts")]
    ServerError { status: u16, attempts: u32 },

    #[error("Could not reach Etsy; gave up after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// A non-retryable 4xx other than 401/429.
    #[error("Etsy returned unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Failed to deserialize the API response: {0}")]
    InvalidResponse(String),

    #[error("Request cancelled before it completed")]
    Cancelled,

    #[error("Failed to build the HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl ApiError {
    /// True for the failures that are only returned once the retry budget is spent.
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. } | ApiError::ServerError { .. } | ApiError::Transport { .. }
        )
    }
}
