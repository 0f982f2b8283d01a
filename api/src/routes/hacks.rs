use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use hackvote_db::{
    hacks::{Hack, NewHack},
    object_id::{EventId, HackId, UserId},
    Txid,
};

use crate::{auth::Authenticated, error::Result, shared_state::AppState};

#[derive(Debug, Serialize)]
pub struct HackResponse {
    pub hack: Hack,
    pub txid: Txid,
}

#[derive(Debug, Serialize)]
pub struct HackWithMembers {
    #[serde(flatten)]
    pub hack: Hack,
    pub members: Vec<UserId>,
}

#[derive(Debug, Serialize)]
pub struct TxidResponse {
    pub txid: Txid,
}

/// Register a team. The caller becomes its first member.
async fn new_hack(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(event_id): Path<EventId>,
    Json(body): Json<NewHack>,
) -> Result<impl IntoResponse> {
    let (hack, txid) = state.store.create_team(event_id, body, user.user_id)?;
    Ok((StatusCode::CREATED, Json(HackResponse { hack, txid })))
}

async fn list_hacks(
    State(state): State<AppState>,
    Authenticated(_user): Authenticated,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse> {
    let hacks = state
        .store
        .hacks_for_event(event_id)
        .into_iter()
        .map(|hack| {
            let members = state
                .store
                .members_of(hack.hack_id)
                .into_iter()
                .map(|m| m.user_id)
                .collect();
            HackWithMembers { hack, members }
        })
        .collect::<Vec<_>>();
    Ok((StatusCode::OK, Json(hacks)))
}

async fn delete_hack(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(hack_id): Path<HackId>,
) -> Result<impl IntoResponse> {
    let (_, txid) = state.store.delete_team(hack_id, user.actor())?;
    Ok((StatusCode::OK, Json(TxidResponse { txid })))
}

pub fn configure() -> Router<AppState> {
    Router::new()
        .route("/events/:event_id/hacks", post(new_hack))
        .route("/events/:event_id/hacks", get(list_hacks))
        .route("/hacks/:hack_id", delete(delete_hack))
}
