//! The mutation gateway as seen from a replica.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use hackvote_db::{
    hack_users::HackUser,
    hack_votes::HackVote,
    hacks::{Hack, NewHack},
    object_id::{AwardId, EventId, HackId, UserId},
    Txid,
};
use hackvote_http_errors::ErrorResponseData;

/// Error kinds surfaced by the gateway, matching the `kind` strings in its
/// error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Closed,
    Unauthenticated,
    Other,
}

impl ErrorKind {
    pub fn from_kind_str(kind: &str) -> Self {
        match kind {
            "validation" => Self::Validation,
            "not_found" => Self::NotFound,
            "forbidden" => Self::Forbidden,
            "conflict" => Self::Conflict,
            "closed" => Self::Closed,
            "authn" => Self::Unauthenticated,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway rejected the mutation. The optimistic write must be
    /// rolled back.
    #[error("{message}")]
    Rejected { kind: ErrorKind, message: String },

    /// The request never got a definitive answer. Treated the same as a
    /// rejection: the mutation may or may not have landed, so the optimistic
    /// write is rolled back and the caller decides whether to retry.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected { kind, .. } => *kind,
            Self::Transport(_) => ErrorKind::Other,
        }
    }
}

/// One method per mutation kind. The caller's identity is fixed at client
/// construction time.
#[async_trait]
pub trait GatewayClient: Send + Sync + 'static {
    async fn create_team(
        &self,
        event_id: EventId,
        new: NewHack,
    ) -> Result<(Hack, Txid), GatewayError>;

    async fn add_member(
        &self,
        hack_id: HackId,
        user_id: UserId,
    ) -> Result<(HackUser, Txid), GatewayError>;

    async fn remove_member(&self, hack_id: HackId, user_id: UserId)
        -> Result<Txid, GatewayError>;

    async fn delete_team(&self, hack_id: HackId) -> Result<Txid, GatewayError>;

    async fn cast_vote(
        &self,
        hack_id: HackId,
        award_id: AwardId,
    ) -> Result<(HackVote, Txid), GatewayError>;

    async fn retract_vote(&self, hack_id: HackId, award_id: AwardId)
        -> Result<Txid, GatewayError>;
}

pub const USER_HEADER: &str = "x-hackvote-user";
pub const ADMIN_HEADER: &str = "x-hackvote-admin";

/// Gateway client speaking the HTTP surface.
pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
    user_id: UserId,
    is_admin: bool,
}

#[derive(Deserialize)]
struct HackCreated {
    hack: Hack,
    txid: Txid,
}

#[derive(Deserialize)]
struct MemberAdded {
    membership: HackUser,
    txid: Txid,
}

#[derive(Deserialize)]
struct VoteCast {
    vote: HackVote,
    txid: Txid,
}

#[derive(Deserialize)]
struct TxidOnly {
    txid: Txid,
}

impl HttpGatewayClient {
    pub fn new(base_url: impl Into<String>, user_id: UserId) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}/api/{}", self.base_url, path))
            .header(USER_HEADER, self.user_id.to_string());
        if self.is_admin {
            req = req.header(ADMIN_HEADER, "true");
        }
        req
    }

    async fn send<T: serde::de::DeserializeOwned>(
        req: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = req
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))
        } else {
            let body = response
                .json::<ErrorResponseData>()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            Err(GatewayError::Rejected {
                kind: ErrorKind::from_kind_str(body.kind()),
                message: body.message().to_string(),
            })
        }
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn create_team(
        &self,
        event_id: EventId,
        new: NewHack,
    ) -> Result<(Hack, Txid), GatewayError> {
        let body = serde_json::json!({
            "team_name": new.team_name,
            "project_name": new.project_name,
            "project_description": new.project_description,
            "project_url": new.project_url,
            "team_image": new.team_image,
        });
        let res: HackCreated = Self::send(
            self.request(reqwest::Method::POST, &format!("events/{event_id}/hacks"))
                .json(&body),
        )
        .await?;
        Ok((res.hack, res.txid))
    }

    async fn add_member(
        &self,
        hack_id: HackId,
        user_id: UserId,
    ) -> Result<(HackUser, Txid), GatewayError> {
        let res: MemberAdded = Self::send(
            self.request(reqwest::Method::POST, &format!("hacks/{hack_id}/members"))
                .json(&serde_json::json!({ "user_id": user_id })),
        )
        .await?;
        Ok((res.membership, res.txid))
    }

    async fn remove_member(
        &self,
        hack_id: HackId,
        user_id: UserId,
    ) -> Result<Txid, GatewayError> {
        let res: TxidOnly = Self::send(self.request(
            reqwest::Method::DELETE,
            &format!("hacks/{hack_id}/members/{user_id}"),
        ))
        .await?;
        Ok(res.txid)
    }

    async fn delete_team(&self, hack_id: HackId) -> Result<Txid, GatewayError> {
        let res: TxidOnly =
            Self::send(self.request(reqwest::Method::DELETE, &format!("hacks/{hack_id}"))).await?;
        Ok(res.txid)
    }

    async fn cast_vote(
        &self,
        hack_id: HackId,
        award_id: AwardId,
    ) -> Result<(HackVote, Txid), GatewayError> {
        let res: VoteCast = Self::send(self.request(
            reqwest::Method::POST,
            &format!("hacks/{hack_id}/votes/{award_id}"),
        ))
        .await?;
        Ok((res.vote, res.txid))
    }

    async fn retract_vote(
        &self,
        hack_id: HackId,
        award_id: AwardId,
    ) -> Result<Txid, GatewayError> {
        let res: TxidOnly = Self::send(self.request(
            reqwest::Method::DELETE,
            &format!("hacks/{hack_id}/votes/{award_id}"),
        ))
        .await?;
        Ok(res.txid)
    }
}
