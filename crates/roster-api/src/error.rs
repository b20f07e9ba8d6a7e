//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered as `{"detail": "..."}`. Store and codec errors
//! are logged in full where they occur; the client only sees a generic
//! message.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Malformed or missing input.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// The document store was unreachable or rejected the operation.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A stored document could not be decoded, or a record could not be
  /// encoded.
  #[error("codec error: {0}")]
  Codec(#[source] roster_core::Error),
}

impl ApiError {
  /// Wrap a store failure, logging it within the current handler span.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    tracing::error!(error = %e, "document store operation failed");
    ApiError::Store(Box::new(e))
  }

  pub fn validation(detail: String) -> Self {
    tracing::debug!(%detail, "rejected invalid input");
    ApiError::Validation(detail)
  }

  pub fn student_not_found() -> Self {
    tracing::debug!("student not found");
    ApiError::NotFound("Student not found".to_owned())
  }
}

impl From<roster_core::Error> for ApiError {
  fn from(e: roster_core::Error) -> Self {
    match e {
      roster_core::Error::InvalidField { .. } => ApiError::validation(e.to_string()),
      other => {
        tracing::error!(error = %other, "failed to convert student record");
        ApiError::Codec(other)
      }
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::validation(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::validation(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    tracing::debug!(reason = %rejection.body_text(), "undecodable student id");
    ApiError::student_not_found()
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, detail) = match &self {
      ApiError::Validation(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Store(_) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal store error".to_owned(),
      ),
      ApiError::Codec(_) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_owned(),
      ),
    };
    (status, Json(json!({ "detail": detail }))).into_response()
  }
}
