use serde::{Deserialize, Serialize};

use crate::object_id::{EventId, HackId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hack {
    pub hack_id: HackId,
    pub event_id: EventId,
    pub team_name: String,
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_url: Option<String>,
    /// Reference into the image pipeline, opaque to this subsystem.
    pub team_image: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHack {
    pub team_name: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_description: Option<String>,
    #[serde(default)]
    pub project_url: Option<String>,
    #[serde(default)]
    pub team_image: Option<String>,
}
