use std::collections::HashSet;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use hackvote_db::{Cursor, TableName};

use crate::{
    auth::Authenticated,
    error::{Error, Result},
    shared_state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    #[serde(default)]
    pub cursor: Cursor,
    /// Comma-separated list of table names; absent means all tables.
    #[serde(default)]
    pub tables: Option<String>,
    /// How long to hold the poll open waiting for events, capped by server
    /// config. Zero returns immediately.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn parse_tables(raw: &str) -> Result<HashSet<TableName>> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<TableName>()
                .map_err(Error::BadRequest)
        })
        .collect()
}

/// Long-poll batch fetch from the change feed. Returns as soon as a matching
/// event lands past the cursor; otherwise returns an empty batch once the
/// wait expires. The returned cursor is always safe to resume from.
async fn changes(
    State(state): State<AppState>,
    Authenticated(_user): Authenticated,
    Query(query): Query<ChangesQuery>,
) -> Result<impl IntoResponse> {
    let tables = query
        .tables
        .as_deref()
        .map(parse_tables)
        .transpose()?;

    let timeout = query
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(state.feed_poll_timeout)
        .min(state.feed_poll_timeout);

    let batch = if timeout.is_zero() {
        state.store.feed().events_after(query.cursor, tables.as_ref())
    } else {
        state
            .store
            .feed()
            .wait_after(query.cursor, tables.as_ref(), timeout)
            .await
    };

    Ok((StatusCode::OK, Json(batch)))
}

pub fn configure() -> Router<AppState> {
    Router::new().route("/changes", get(changes))
}
