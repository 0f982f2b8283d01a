use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use hackvote_db::{
    hack_users::HackUser,
    object_id::{HackId, UserId},
    Txid,
};

use crate::{auth::Authenticated, error::Result, shared_state::AppState};

use super::hacks::TxidResponse;

#[derive(Debug, Deserialize)]
pub struct AddMemberInput {
    /// Defaults to the calling user. Adding someone else requires admin.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub membership: HackUser,
    pub txid: Txid,
}

async fn add_member(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(hack_id): Path<HackId>,
    Json(body): Json<AddMemberInput>,
) -> Result<impl IntoResponse> {
    let target = body.user_id.unwrap_or(user.user_id);
    let (membership, txid) = state.store.add_member(hack_id, target, user.actor())?;
    Ok((StatusCode::CREATED, Json(MemberResponse { membership, txid })))
}

#[derive(Deserialize)]
pub struct MemberPath {
    hack_id: HackId,
    user_id: UserId,
}

async fn remove_member(
    State(state): State<AppState>,
    Authenticated(user): Authenticated,
    Path(path): Path<MemberPath>,
) -> Result<impl IntoResponse> {
    let (_, txid) = state
        .store
        .remove_member(path.hack_id, path.user_id, user.actor())?;
    Ok((StatusCode::OK, Json(TxidResponse { txid })))
}

pub fn configure() -> Router<AppState> {
    Router::new()
        .route("/hacks/:hack_id/members", post(add_member))
        .route("/hacks/:hack_id/members/:user_id", delete(remove_member))
}
