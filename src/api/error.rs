use crate::error::TrackerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// A failed request: validation problems become 400, everything else 500
/// with the underlying message attached.
pub struct ApiError {
    context: &'static str,
    source: TrackerError,
}

impl ApiError {
    pub fn new(context: &'static str, source: TrackerError) -> Self {
        Self { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.source {
            TrackerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            other => {
                error!("{}: {}", self.context, other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{}: {}", self.context, other),
                )
                    .into_response()
            }
        }
    }
}
