//! The change feed as seen from a replica.

use std::collections::HashSet;

use async_trait::async_trait;

use hackvote_db::{object_id::UserId, Cursor, FeedBatch, TableName};

use crate::gateway::{GatewayError, USER_HEADER};

/// A resumable, filterable view of the change feed. `next_batch` may block
/// (long-poll) for a bounded time; an empty batch just means nothing matched
/// before the poll expired and the caller should poll again from the
/// returned cursor.
#[async_trait]
pub trait ChangeFeedClient: Send + Sync + 'static {
    async fn next_batch(
        &self,
        cursor: Cursor,
        tables: Option<&HashSet<TableName>>,
    ) -> Result<FeedBatch, GatewayError>;
}

/// Feed client speaking the gateway's `/api/changes` long-poll endpoint.
pub struct HttpFeedClient {
    client: reqwest::Client,
    base_url: String,
    user_id: UserId,
    poll_timeout_ms: u64,
}

impl HttpFeedClient {
    pub fn new(base_url: impl Into<String>, user_id: UserId) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            user_id,
            poll_timeout_ms: 25_000,
        }
    }

    pub fn with_poll_timeout_ms(mut self, ms: u64) -> Self {
        self.poll_timeout_ms = ms;
        self
    }
}

#[async_trait]
impl ChangeFeedClient for HttpFeedClient {
    async fn next_batch(
        &self,
        cursor: Cursor,
        tables: Option<&HashSet<TableName>>,
    ) -> Result<FeedBatch, GatewayError> {
        let mut query: Vec<(&str, String)> = vec![
            ("cursor", cursor.to_string()),
            ("timeout_ms", self.poll_timeout_ms.to_string()),
        ];
        if let Some(tables) = tables {
            let names: Vec<&str> = tables.iter().map(|t| t.as_str()).collect();
            query.push(("tables", names.join(",")));
        }

        let response = self
            .client
            .get(format!("{}/api/changes", self.base_url))
            .header(USER_HEADER, self.user_id.to_string())
            .query(&query)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "change feed returned {}",
                response.status()
            )));
        }

        response
            .json::<FeedBatch>()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}
