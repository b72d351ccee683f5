//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gradebook_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] gradebook_core::Error),

  #[error("missing or invalid bearer token")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Core(e) => {
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
      }
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::Core(e) if e.kind() == ErrorKind::Internal => {
        tracing::error!(error = %e, "internal error while handling request");
        "internal server error".to_string()
      }
      ApiError::Internal(m) => {
        tracing::error!(error = %m, "internal error while handling request");
        "internal server error".to_string()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn core_errors_keep_their_status() {
    let id = Uuid::new_v4();
    let cases = [
      (gradebook_core::Error::CourseNotFound(id), StatusCode::NOT_FOUND),
      (gradebook_core::Error::TermAlreadyClosed(id), StatusCode::CONFLICT),
      (gradebook_core::Error::NoEvaluations(id), StatusCode::PRECONDITION_FAILED),
      (gradebook_core::Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
      (gradebook_core::Error::DeadlineExceeded, StatusCode::SERVICE_UNAVAILABLE),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[tokio::test]
  async fn store_failures_are_not_leaked() {
    let cause = std::io::Error::other("disk on fire");
    let err = ApiError::from(gradebook_core::Error::Store(Box::new(cause)));
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("disk on fire"));
    assert!(text.contains("internal server error"));
  }
}
