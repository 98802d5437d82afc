use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Client-facing error taxonomy. Store internals never leak into these:
/// anything unmapped collapses to `Internal` and is logged server-side.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("bad request")]
    BadRequest,
    #[error("{0} not found")]
    NotFound(String),
    #[error("already exists")]
    Conflict,
    #[error("internal error")]
    Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound { column, value } => {
                ApiError::NotFound(format!("{column} of {value}"))
            }
            RepoError::BadInput => ApiError::BadRequest,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(err) => {
                tracing::error!(error = %err, "store failure");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody {
            error: self.to_string(),
        })
    }
}
