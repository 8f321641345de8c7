use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use derive_more::From;
use tokio::task::JoinError;

use crate::Error;

/// Failure of an API request, rendered as a plain-text response.
#[derive(Debug, From)]
pub(crate) enum ApiError {
    NotFound(&'static str),
    BadRequest(&'static str),
    Unauthorized,
    /// The registry or its snapshot rejected the operation. A failed save leaves the in-memory
    /// mutation applied.
    #[from]
    Service(Error),
    /// The blocking task running the operation panicked.
    #[from]
    Task(JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Service(Error::InvalidFlagName) => {
                (StatusCode::BAD_REQUEST, "Missing flag name")
            }
            ApiError::Service(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save flag to file",
            ),
            ApiError::Task(err) => {
                log::error!(target: "flagpole", "flag operation panicked: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}
