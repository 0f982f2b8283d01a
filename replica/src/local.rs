//! In-process gateway and feed clients over a shared [`DurableStore`].
//!
//! These serve same-process embeddings (server-rendered pages sharing the
//! store with the HTTP gateway) and keep the replica tests independent of a
//! running server.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hackvote_db::{
    hack_users::HackUser,
    hack_votes::HackVote,
    hacks::{Hack, NewHack},
    object_id::{AwardId, EventId, HackId, UserId},
    Actor, Cursor, DurableStore, FeedBatch, StoreError, TableName, Txid,
};

use crate::feed_client::ChangeFeedClient;
use crate::gateway::{ErrorKind, GatewayClient, GatewayError};

fn convert(err: StoreError) -> GatewayError {
    let kind = match &err {
        StoreError::Validation(_) => ErrorKind::Validation,
        StoreError::NotFound(_) => ErrorKind::NotFound,
        StoreError::Forbidden => ErrorKind::Forbidden,
        StoreError::Conflict(_) => ErrorKind::Conflict,
        StoreError::Closed(_) => ErrorKind::Closed,
    };
    GatewayError::Rejected {
        kind,
        message: err.to_string(),
    }
}

pub struct LocalGateway {
    store: Arc<DurableStore>,
    actor: Actor,
}

impl LocalGateway {
    pub fn new(store: Arc<DurableStore>, actor: Actor) -> Self {
        Self { store, actor }
    }
}

#[async_trait]
impl GatewayClient for LocalGateway {
    async fn create_team(
        &self,
        event_id: EventId,
        new: NewHack,
    ) -> Result<(Hack, Txid), GatewayError> {
        self.store
            .create_team(event_id, new, self.actor.user_id)
            .map_err(convert)
    }

    async fn add_member(
        &self,
        hack_id: HackId,
        user_id: UserId,
    ) -> Result<(HackUser, Txid), GatewayError> {
        self.store
            .add_member(hack_id, user_id, self.actor)
            .map_err(convert)
    }

    async fn remove_member(
        &self,
        hack_id: HackId,
        user_id: UserId,
    ) -> Result<Txid, GatewayError> {
        self.store
            .remove_member(hack_id, user_id, self.actor)
            .map(|(_, txid)| txid)
            .map_err(convert)
    }

    async fn delete_team(&self, hack_id: HackId) -> Result<Txid, GatewayError> {
        self.store
            .delete_team(hack_id, self.actor)
            .map(|(_, txid)| txid)
            .map_err(convert)
    }

    async fn cast_vote(
        &self,
        hack_id: HackId,
        award_id: AwardId,
    ) -> Result<(HackVote, Txid), GatewayError> {
        self.store
            .cast_vote(hack_id, award_id, self.actor.user_id)
            .map_err(convert)
    }

    async fn retract_vote(
        &self,
        hack_id: HackId,
        award_id: AwardId,
    ) -> Result<Txid, GatewayError> {
        self.store
            .retract_vote(hack_id, award_id, self.actor.user_id, self.actor)
            .map(|(_, txid)| txid)
            .map_err(convert)
    }
}

pub struct LocalFeedClient {
    store: Arc<DurableStore>,
    poll_timeout: Duration,
}

impl LocalFeedClient {
    pub fn new(store: Arc<DurableStore>) -> Self {
        Self {
            store,
            poll_timeout: Duration::from_millis(250),
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }
}

#[async_trait]
impl ChangeFeedClient for LocalFeedClient {
    async fn next_batch(
        &self,
        cursor: Cursor,
        tables: Option<&HashSet<TableName>>,
    ) -> Result<FeedBatch, GatewayError> {
        Ok(self
            .store
            .feed()
            .wait_after(cursor, tables, self.poll_timeout)
            .await)
    }
}
