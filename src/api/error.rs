//! Error types and conversions used by the public API layer.
//!
//! Every error renders as a flat JSON body of shape `{"error": "<message>"}`
//! with the matching HTTP status, which is the only error shape the wire
//! protocol knows.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use tracing::error;

use crate::order::book;

/// API error which can be converted into an HTTP response.
#[derive(Debug)]
pub enum Error {
    /// Resource not found. Returns 404.
    NotFound(String),
    /// Client input error. Returns 400.
    BadRequest(String),
    /// Unexpected internal error. Returns 500 with the message embedded.
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl From<book::Error> for Error {
    fn from(value: book::Error) -> Self {
        match value {
            book::Error::OrderNotFound(_) => Error::NotFound("Order not found".to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Error::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Error::Internal(err) => {
                error!("internal error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = Json(serde_json::json!({ "error": message }));
        (status, body).into_response()
    }
}
