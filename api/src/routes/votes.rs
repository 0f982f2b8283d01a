use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use hackvote_db::{
    hack_votes::HackVote,
    object_id::{AwardId, HackId},
    Txid,
};

use crate::{auth::Authenticated, error::Result, shared_state::AppState};

use super::hacks::TxidResponse;

#[derive(Deserialize)]
pub struct VotePath {
    hack_id: HackId,
    award_id: AwardId,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub vote: HackVote,
    pub txid: Txid,
}

/// Cast the calling user's vote for this hack under this award.
async fn cast_vote(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(path): Path<VotePath>,
) -> Result<impl IntoResponse> {
    let (vote, txid) = state
        .store
        .cast_vote(path.hack_id, path.award_id, user.user_id)?;
    Ok((StatusCode::CREATED, Json(VoteResponse { vote, txid })))
}

async fn retract_vote(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(path): Path<VotePath>,
) -> Result<impl IntoResponse> {
    let (_, txid) =
        state
            .store
            .retract_vote(path.hack_id, path.award_id, user.user_id, user.actor())?;
    Ok((StatusCode::OK, Json(TxidResponse { txid })))
}

pub fn configure() -> Router<AppState> {
    Router::new()
        .route("/hacks/:hack_id/votes/:award_id", post(cast_vote))
        .route("/hacks/:hack_id/votes/:award_id", delete(retract_vote))
}
