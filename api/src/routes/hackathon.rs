use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use hackvote_db::{object_id::EventId, Deadline, HackathonState};

use crate::{auth::Authenticated, error::Result, shared_state::AppState};

use super::events::EventResponse;

#[derive(Debug, Deserialize)]
pub struct HackathonStateInput {
    pub state: HackathonState,
    #[serde(default)]
    pub hack_until: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub vote_until: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub clear_hack_until: bool,
    #[serde(default)]
    pub clear_vote_until: bool,
}

fn deadline(set: Option<chrono::DateTime<chrono::Utc>>, clear: bool) -> Deadline {
    match (set, clear) {
        (_, true) => Deadline::Clear,
        (Some(t), false) => Deadline::Set(t),
        (None, false) => Deadline::Keep,
    }
}

async fn set_state(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(event_id): Path<EventId>,
    Json(body): Json<HackathonStateInput>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    let (event, txid) = state.store.set_hackathon_state(
        event_id,
        body.state,
        deadline(body.hack_until, body.clear_hack_until),
        deadline(body.vote_until, body.clear_vote_until),
    )?;
    Ok((StatusCode::OK, Json(EventResponse { event, txid })))
}

pub fn configure() -> Router<AppState> {
    Router::new().route("/events/:event_id/hackathon", post(set_state))
}
