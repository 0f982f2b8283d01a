use serde::{Deserialize, Serialize};

use crate::object_id::{HackId, UserId};

/// Team membership. The (hack_id, user_id) pair is the identity; there is no
/// surrogate key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HackUser {
    pub hack_id: HackId,
    pub user_id: UserId,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}
