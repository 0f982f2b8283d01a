use serde::{Deserialize, Serialize};

use crate::object_id::{AwardId, EventId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub award_id: AwardId,
    pub event_id: EventId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewAward {
    pub name: String,
}
