use serde::{Deserialize, Serialize};

use crate::object_id::{AwardId, HackId, UserId};

/// One user's vote for one hack under one award. The
/// (hack_id, award_id, user_id) triple is the identity and is unique.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HackVote {
    pub hack_id: HackId,
    pub award_id: AwardId,
    pub user_id: UserId,
    pub cast_at: chrono::DateTime<chrono::Utc>,
}
