//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::DotacionError;

const INTERNAL_MESSAGE: &str = "internal error while executing the request";

/// A service error on its way to the client.
///
/// Server-side failures carry database detail, which is only exposed when
/// `verbose` is set.
#[derive(Debug)]
pub struct ApiError {
    error: DotacionError,
    verbose: bool,
}

impl ApiError {
    pub fn new(error: DotacionError, verbose: bool) -> Self {
        Self { error, verbose }
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.error {
            DotacionError::Validation(_) => StatusCode::BAD_REQUEST,
            DotacionError::NotFound(_) => StatusCode::NOT_FOUND,
            DotacionError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        if self.error.is_client_error() || self.verbose {
            self.error.to_string()
        } else {
            INTERNAL_MESSAGE.to_string()
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.error, "request failed");
        } else {
            tracing::debug!(error = %self.error, status = status.as_u16(), "request rejected");
        }
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}
