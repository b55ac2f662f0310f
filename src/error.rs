use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::UnknownVariant;

/// RepositoryError
///
/// Failures raised by a persistence backend. Never shown to clients.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(#[from] UnknownVariant),
}

/// TodoError
///
/// Outcome of a failed service operation. Ownership mismatches surface as `NotFound`
/// so that non-owners cannot probe for the existence of other users' records.
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error("caller is not authenticated")]
    NotAuthenticated,

    #[error("todo not found")]
    NotFound,

    #[error("title must not be blank")]
    BlankTitle,

    /// Body, query string or path segment could not be parsed. The parser message is
    /// logged at debug level only.
    #[error("malformed request")]
    BadRequest,

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

pub type TodoResult<T> = Result<T, TodoError>;

/// ErrorBody
///
/// JSON body returned for every failed request. Carries the error kind only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl TodoError {
    pub fn status(&self) -> StatusCode {
        match self {
            TodoError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            TodoError::NotFound => StatusCode::NOT_FOUND,
            TodoError::BlankTitle => StatusCode::UNPROCESSABLE_ENTITY,
            TodoError::BadRequest => StatusCode::BAD_REQUEST,
            TodoError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TodoError::NotAuthenticated => "not_authenticated",
            TodoError::NotFound => "not_found",
            TodoError::BlankTitle => "blank_title",
            TodoError::BadRequest => "bad_request",
            TodoError::Storage(_) => "action_failed",
        }
    }
}

// Extractor rejections carry serde detail; keep it in the logs and out of the response.
impl From<JsonRejection> for TodoError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {}", rejection.body_text());
        TodoError::BadRequest
    }
}

impl From<QueryRejection> for TodoError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("rejected query string: {}", rejection.body_text());
        TodoError::BadRequest
    }
}

impl From<PathRejection> for TodoError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("rejected path: {}", rejection.body_text());
        TodoError::BadRequest
    }
}

impl IntoResponse for TodoError {
    fn into_response(self) -> Response {
        if let TodoError::Storage(e) = &self {
            tracing::error!("storage failure: {:?}", e);
        }
        let body = ErrorBody {
            error: self.kind().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
