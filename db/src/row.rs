//! Tagged row types crossing the change feed boundary.
//!
//! Rows are explicit per-table schemas rather than free-form maps so that
//! malformed rows are rejected at deserialization time instead of surfacing
//! as shape errors deep inside a replica.

use serde::{Deserialize, Serialize};

use crate::{
    awards::Award,
    events::Event,
    hack_users::HackUser,
    hack_votes::HackVote,
    hacks::Hack,
    object_id::{AwardId, EventId, HackId, UserId},
};

/// Identifier of a committed store transaction. Monotonically increasing,
/// comparable for equality against change feed event tags.
pub type Txid = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Events,
    Hacks,
    HackUsers,
    Awards,
    HackVotes,
}

impl TableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Hacks => "hacks",
            Self::HackUsers => "hack_users",
            Self::Awards => "awards",
            Self::HackVotes => "hack_votes",
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "events" => Ok(Self::Events),
            "hacks" => Ok(Self::Hacks),
            "hack_users" => Ok(Self::HackUsers),
            "awards" => Ok(Self::Awards),
            "hack_votes" => Ok(Self::HackVotes),
            other => Err(format!("unknown table {other}")),
        }
    }
}

/// Deterministic per-table key. Single-id tables key on their id; the
/// composite-key tables key on the full pair or triple, never on a surrogate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKey {
    Event(EventId),
    Hack(HackId),
    HackUser(HackId, UserId),
    Award(AwardId),
    HackVote(HackId, AwardId, UserId),
}

impl RowKey {
    pub fn table(&self) -> TableName {
        match self {
            Self::Event(_) => TableName::Events,
            Self::Hack(_) => TableName::Hacks,
            Self::HackUser(..) => TableName::HackUsers,
            Self::Award(_) => TableName::Awards,
            Self::HackVote(..) => TableName::HackVotes,
        }
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(e) => write!(f, "{e}"),
            Self::Hack(h) => write!(f, "{h}"),
            Self::HackUser(h, u) => write!(f, "{h}-{u}"),
            Self::Award(a) => write!(f, "{a}"),
            Self::HackVote(h, a, u) => write!(f, "{h}-{a}-{u}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum RowData {
    Event(Event),
    Hack(Hack),
    HackUser(HackUser),
    Award(Award),
    HackVote(HackVote),
}

impl RowData {
    pub fn table(&self) -> TableName {
        match self {
            Self::Event(_) => TableName::Events,
            Self::Hack(_) => TableName::Hacks,
            Self::HackUser(_) => TableName::HackUsers,
            Self::Award(_) => TableName::Awards,
            Self::HackVote(_) => TableName::HackVotes,
        }
    }

    pub fn key(&self) -> RowKey {
        match self {
            Self::Event(e) => RowKey::Event(e.event_id),
            Self::Hack(h) => RowKey::Hack(h.hack_id),
            Self::HackUser(m) => RowKey::HackUser(m.hack_id, m.user_id),
            Self::Award(a) => RowKey::Award(a.award_id),
            Self::HackVote(v) => RowKey::HackVote(v.hack_id, v.award_id, v.user_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One committed row change. Delete events carry the row's last value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub txid: Txid,
    pub op: ChangeOp,
    #[serde(flatten)]
    pub row: RowData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::HackathonState;

    #[test]
    fn change_event_round_trips_with_table_tag() {
        let event = ChangeEvent {
            txid: 7,
            op: ChangeOp::Update,
            row: RowData::Event(Event {
                event_id: EventId::new(),
                name: "DemoCon".into(),
                slug: "democon".into(),
                start_time: chrono::Utc::now(),
                end_time: chrono::Utc::now(),
                is_hackathon: true,
                hackathon_state: HackathonState::Hacking,
                hack_started_at: None,
                hack_until: None,
                vote_started_at: None,
                vote_until: None,
            }),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["table"], "event");
        let back: ChangeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn composite_keys_are_derived_from_the_full_identity() {
        let hack = HackId::new();
        let award = AwardId::new();
        let user = UserId::new();

        let vote = RowData::HackVote(HackVote {
            hack_id: hack,
            award_id: award,
            user_id: user,
            cast_at: chrono::Utc::now(),
        });
        assert_eq!(vote.key(), RowKey::HackVote(hack, award, user));
        assert_eq!(vote.key().to_string(), format!("{hack}-{award}-{user}"));
    }
}
