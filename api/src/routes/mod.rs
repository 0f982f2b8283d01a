use axum::Router;

use crate::shared_state::AppState;

mod awards;
mod changes;
mod events;
mod hackathon;
mod hacks;
mod health;
mod members;
mod votes;

pub fn configure_routes() -> Router<AppState> {
    let api = Router::new()
        .merge(events::configure())
        .merge(hacks::configure())
        .merge(members::configure())
        .merge(votes::configure())
        .merge(awards::configure())
        .merge(hackathon::configure())
        .merge(changes::configure());

    Router::new()
        .merge(health::configure())
        .nest("/api", api)
}
