use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use hackvote_db::{
    events::{Event, NewEvent},
    object_id::EventId,
    StoreError, Txid,
};

use crate::{
    auth::Authenticated,
    error::{Error, Result},
    shared_state::AppState,
};

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event: Event,
    pub txid: Txid,
}

/// Seeding path for the organizer workflow, which otherwise lives outside
/// this service.
async fn new_event(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Json(body): Json<NewEvent>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    let (event, txid) = state.store.insert_event(body)?;
    Ok((StatusCode::CREATED, Json(EventResponse { event, txid })))
}

async fn get_event(
    State(state): State<AppState>,
    Authenticated(_user): Authenticated,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse> {
    let event = state
        .store
        .event(event_id)
        .ok_or(Error::Store(StoreError::NotFound("event")))?;
    Ok((StatusCode::OK, Json(event)))
}

pub fn configure() -> Router<AppState> {
    Router::new()
        .route("/events", post(new_event))
        .route("/events/:event_id", get(get_event))
}
