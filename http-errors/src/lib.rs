//! The `{error: {kind, message}}` body shared between the mutation gateway
//! and its clients. The replica engine deserializes this to recover the error
//! kind for rollback reporting.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{event, Level};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseData {
    error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorDetails {
    kind: Cow<'static, str>,
    message: Cow<'static, str>,
}

impl ErrorResponseData {
    pub fn new(
        kind: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> ErrorResponseData {
        let ret = ErrorResponseData {
            error: ErrorDetails {
                kind: kind.into(),
                message: message.into(),
            },
        };

        event!(Level::ERROR, kind=%ret.error.kind, message=%ret.error.message);

        ret
    }

    pub fn kind(&self) -> &str {
        &self.error.kind
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }
}
