//! Drop-in replacements for axum's `Json`, `Path` and `Query` whose
//! rejections are reported through [`ApiError`], so malformed input gets the
//! same `{status, detail}` body as every other error.

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::api::errors::ApiError;

pub(crate) struct Json<T>(pub(crate) T);
pub(crate) struct Path<T>(pub(crate) T);
pub(crate) struct Query<T>(pub(crate) T);

fn rejection_to_api_error(status: StatusCode, body: String) -> ApiError {
    if status.is_server_error() {
        ApiError::internal(body, "Failed to extract request")
    } else {
        ApiError::BadRequest(body)
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => {
                Err(rejection_to_api_error(rejection.status(), rejection.body_text()))
            }
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => {
                Err(rejection_to_api_error(rejection.status(), rejection.body_text()))
            }
        }
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Query(value)),
            Err(rejection) => {
                Err(rejection_to_api_error(rejection.status(), rejection.body_text()))
            }
        }
    }
}
