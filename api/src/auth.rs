//! Identity extraction.
//!
//! Session handling lives in the fronting web layer, which terminates the
//! cookie/session machinery and forwards a stable user id plus the admin flag
//! as trusted headers. The gateway only consumes that identity.

use async_trait::async_trait;
use axum::http::request::Parts;
use hackvote_db::{object_id::UserId, Actor};

use crate::error::Error;

pub const USER_HEADER: &str = "x-hackvote-user";
pub const ADMIN_HEADER: &str = "x-hackvote-admin";

#[derive(Debug, Clone, Copy)]
pub struct UserInfo {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl UserInfo {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            is_admin: self.is_admin,
        }
    }

    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}

pub struct Authenticated(pub UserInfo);

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<UserId>().ok())
            .ok_or(Error::Unauthenticated)?;

        let is_admin = parts
            .headers
            .get(ADMIN_HEADER)
            .map(|v| v.as_bytes() == b"true")
            .unwrap_or(false);

        Ok(Authenticated(UserInfo { user_id, is_admin }))
    }
}
