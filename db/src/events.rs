use serde::{Deserialize, Serialize};

use crate::{enums::HackathonState, object_id::EventId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub name: String,
    /// Unique, URL-safe identifier for the event's public pages.
    pub slug: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    pub is_hackathon: bool,
    pub hackathon_state: HackathonState,
    pub hack_started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub hack_until: Option<chrono::DateTime<chrono::Utc>>,
    pub vote_started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub vote_until: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub slug: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub is_hackathon: bool,
}
