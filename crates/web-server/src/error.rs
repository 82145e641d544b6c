use analytics::AnalyticsError;
use api_client::error::ApiError;
use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use core_types::CoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Etsy API error: {0}")]
    Api(#[from] ApiError),
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Undeserialisable query strings (`limit=abc`, `compare=yes`) get the same
/// JSON error body as every other bad request.
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl AppError {
    /// The HTTP status a client sees for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Api(api_err) => match api_err {
                ApiError::NotConfigured(_) | ApiError::ClientBuild(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ApiError::RateLimited { .. } | ApiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                ApiError::ServerError { .. }
                | ApiError::Transport { .. }
                | ApiError::UnexpectedStatus { .. }
                | ApiError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            },
            AppError::Analytics(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Api(ApiError::NotConfigured(_)) => {
                tracing::error!(error = ?self, "Server configuration error.");
                "A server configuration error occurred".to_string()
            }
            AppError::Api(ApiError::RateLimited { .. }) => {
                tracing::warn!(error = ?self, "Etsy rate limit persisted past retries.");
                "Etsy is rate limiting requests, try again shortly".to_string()
            }
            AppError::Api(api_err) => {
                tracing::error!(error = ?api_err, "Etsy API error.");
                api_err.to_string()
            }
            AppError::Analytics(analytics_err) => {
                tracing::error!(error = ?analytics_err, "Malformed upstream payload.");
                "Etsy returned data in an unexpected shape".to_string()
            }
            AppError::BadRequest(message) => message.clone(),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (AppError::Api(ApiError::NotConfigured("x".into())), 500),
            (AppError::Api(ApiError::RateLimited { attempts: 4 }), 503),
            (AppError::Api(ApiError::Cancelled), 503),
            (AppError::Api(ApiError::Unauthorized("x".into())), 401),
            (AppError::Api(ApiError::ServerError { status: 500, attempts: 4 }), 502),
            (
                AppError::Api(ApiError::UnexpectedStatus { status: 404, body: String::new() }),
                502,
            ),
            (AppError::BadRequest("x".into()), 400),
            (
                AppError::Analytics(AnalyticsError::MalformedPayload {
                    field: "orders".into(),
                    reason: "x".into(),
                }),
                502,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status().as_u16(), expected, "{err}");
        }
    }

    #[test]
    fn core_errors_are_bad_requests() {
        let err: AppError = CoreError::UnknownSeries("x".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
