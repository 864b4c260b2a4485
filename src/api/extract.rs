//! Request extractors that keep rejections inside the API error shape.
//!
//! Axum's built-in `Json` and `Query` extractors short-circuit handlers with
//! their own plain-text responses (422 for a type mismatch, 415 for a missing
//! content type). The wire protocol only speaks JSON `{"error": ...}` bodies
//! with 400 for bad input, so these wrappers funnel every extractor rejection
//! through [`Error::BadRequest`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::Json;
use http::request::Parts;

use crate::api::error::Error;

/// JSON body extractor whose rejections render as 400 `{"error": ...}`.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(Error::BadRequest(rejection.body_text())),
        }
    }
}

/// Query string extractor whose rejections render as 400 `{"error": ...}`.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(Error::BadRequest(rejection.body_text())),
        }
    }
}
