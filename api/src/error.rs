use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hackvote_db::StoreError;
use thiserror::Error;

use hackvote_http_errors::ErrorResponseData;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Not allowed")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}

impl Error {
    fn error_kind(&self) -> &'static str {
        match self {
            Error::Store(StoreError::Validation(_)) => "validation",
            Error::Store(StoreError::NotFound(_)) => "not_found",
            Error::Store(StoreError::Forbidden) => "forbidden",
            Error::Store(StoreError::Conflict(_)) => "conflict",
            Error::Store(StoreError::Closed(_)) => "closed",
            Error::Unauthenticated => "authn",
            Error::Forbidden => "forbidden",
            Error::BadRequest(_) => "bad_request",
            Error::Generic(_) => "internal_server_error",
        }
    }

    pub fn response_tuple(&self) -> (StatusCode, ErrorResponseData) {
        let status = match self {
            Error::Store(StoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            Error::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Store(StoreError::Forbidden) => StatusCode::FORBIDDEN,
            Error::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Error::Store(StoreError::Closed(_)) => StatusCode::BAD_REQUEST,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            ErrorResponseData::new(self.error_kind(), self.to_string()),
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (code, json) = self.response_tuple();
        (code, Json(json)).into_response()
    }
}
