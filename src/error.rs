//! Error types. Catalogue failures are fatal for the feature; store and
//! request failures map onto HTTP statuses.

use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
  #[error("failed to read catalogue {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("malformed catalogue: {0}")]
  Parse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("result store io: {0}")]
  Io(#[from] std::io::Error),
  #[error("result store encoding: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  NotFound(String),
  #[error(transparent)]
  Catalogue(#[from] CatalogueError),
  #[error(transparent)]
  Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> axum::response::Response {
    let status = match &self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Catalogue(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      error!(target: "skillplan_backend", error = %self, "Request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
