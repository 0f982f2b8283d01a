use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use hackvote_db::{
    awards::{Award, NewAward},
    object_id::{AwardId, EventId},
    Txid,
};

use crate::{auth::Authenticated, error::Result, shared_state::AppState};

use super::hacks::TxidResponse;

#[derive(Debug, Serialize)]
pub struct AwardResponse {
    pub award: Award,
    pub txid: Txid,
}

#[derive(Debug, Deserialize)]
pub struct AwardInput {
    pub name: String,
}

async fn new_award(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(event_id): Path<EventId>,
    Json(body): Json<NewAward>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    let (award, txid) = state.store.create_award(event_id, body)?;
    Ok((StatusCode::CREATED, Json(AwardResponse { award, txid })))
}

async fn list_awards(
    State(state): State<AppState>,
    Authenticated(_user): Authenticated,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse> {
    Ok((StatusCode::OK, Json(state.store.awards_for_event(event_id))))
}

async fn write_award(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(award_id): Path<AwardId>,
    Json(body): Json<AwardInput>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    let (award, txid) = state.store.update_award(award_id, &body.name)?;
    Ok((StatusCode::OK, Json(AwardResponse { award, txid })))
}

async fn delete_award(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(award_id): Path<AwardId>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    let (_, txid) = state.store.delete_award(award_id)?;
    Ok((StatusCode::OK, Json(TxidResponse { txid })))
}

/// Per-award tallies for the event's award ceremony.
async fn results(
    State(state): State<AppState>,
    Authenticated(_user): Authenticated,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse> {
    Ok((StatusCode::OK, Json(state.store.results(event_id)?)))
}

pub fn configure() -> Router<AppState> {
    Router::new()
        .route("/events/:event_id/awards", post(new_award))
        .route("/events/:event_id/awards", get(list_awards))
        .route("/events/:event_id/results", get(results))
        .route("/awards/:award_id", put(write_award))
        .route("/awards/:award_id", delete(delete_award))
}
