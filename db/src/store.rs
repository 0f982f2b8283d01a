//! The durable store: the system of record for events, hacks, memberships,
//! awards, and votes.
//!
//! Every mutation runs as one transaction under the write lock, which is the
//! single serialization point of the whole system. A transaction validates
//! its invariants, applies all of its row changes, takes the next transaction
//! id, and appends one change event per touched row to the feed before the
//! lock is released. That guarantees feed order equals commit order and that
//! every row of one logical mutation carries the same txid, which is what
//! lets a replica correlate a mutation it submitted with the feed events that
//! confirm it.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use hackvote_rules as rules;
use serde::Serialize;
use thiserror::Error;
use tracing::{event, Level};

use crate::{
    awards::{Award, NewAward},
    enums::HackathonState,
    events::{Event, NewEvent},
    feed::ChangeFeed,
    hack_users::HackUser,
    hack_votes::HackVote,
    hacks::{Hack, NewHack},
    object_id::{AwardId, EventId, HackId, UserId},
    row::{ChangeEvent, ChangeOp, RowData, Txid},
};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not allowed")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Closed(String),
}

impl From<rules::Violation> for StoreError {
    fn from(v: rules::Violation) -> Self {
        use rules::Violation::*;
        match v {
            DuplicateVote | DuplicateMembership | TeamHasVotes | AwardHasVotes => {
                StoreError::Conflict(v.to_string())
            }
            CrossEventVote | EmptyName | NameTooLong => StoreError::Validation(v.to_string()),
            NotAHackathon => StoreError::NotFound("hackathon event"),
            EventEnded | HackingClosed | VotingClosed => StoreError::Closed(v.to_string()),
        }
    }
}

/// The identity performing a mutation, as supplied by the external session
/// provider.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    fn may_act_for(&self, user_id: UserId) -> bool {
        self.is_admin || self.user_id == user_id
    }
}

/// Deadline update carried alongside a lifecycle transition. Deadlines can be
/// set or cleared independently of the state change.
#[derive(Debug, Clone, Copy, Default)]
pub enum Deadline {
    #[default]
    Keep,
    Clear,
    Set(DateTime<Utc>),
}

impl Deadline {
    fn apply(&self, current: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        match self {
            Deadline::Keep => current,
            Deadline::Clear => None,
            Deadline::Set(t) => Some(*t),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AwardTally {
    pub award: Award,
    pub tallies: Vec<HackTally>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HackTally {
    pub hack_id: HackId,
    pub team_name: String,
    pub votes: usize,
}

#[derive(Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    hacks: HashMap<HackId, Hack>,
    hack_users: HashMap<(HackId, UserId), HackUser>,
    awards: HashMap<AwardId, Award>,
    hack_votes: HashMap<(HackId, AwardId, UserId), HackVote>,
    txid: Txid,
}

impl Tables {
    /// Commit the accumulated row changes of one transaction: take the next
    /// txid and tag every change with it. The caller publishes the returned
    /// events to the feed before releasing the write lock.
    fn commit(&mut self, changes: Vec<(ChangeOp, RowData)>) -> (Txid, Vec<ChangeEvent>) {
        self.txid += 1;
        let txid = self.txid;
        let events = changes
            .into_iter()
            .map(|(op, row)| ChangeEvent { txid, op, row })
            .collect();
        (txid, events)
    }

    fn vote_count_for_hack(&self, hack_id: HackId) -> usize {
        self.hack_votes
            .keys()
            .filter(|(h, _, _)| *h == hack_id)
            .count()
    }

    fn vote_count_for_award(&self, award_id: AwardId) -> usize {
        self.hack_votes
            .keys()
            .filter(|(_, a, _)| *a == award_id)
            .count()
    }
}

pub struct DurableStore {
    tables: RwLock<Tables>,
    feed: ChangeFeed,
}

impl Default for DurableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            feed: ChangeFeed::new(),
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Run one mutation transaction. The feed publish happens inside the
    /// write lock so concurrent transactions cannot interleave their events.
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<(T, Vec<(ChangeOp, RowData)>), StoreError>,
    ) -> Result<(T, Txid), StoreError> {
        let mut tables = self.tables.write().unwrap();
        let (value, changes) = f(&mut tables)?;
        let (txid, events) = tables.commit(changes);
        self.feed.publish(events);
        Ok((value, txid))
    }

    // Events are created by the organizer workflow; this is the seeding path
    // it lands on.
    pub fn insert_event(&self, new: NewEvent) -> Result<(Event, Txid), StoreError> {
        self.transaction(|t| {
            let name = rules::valid_name(&new.name)?.to_string();
            if t.events.values().any(|e| e.slug == new.slug) {
                return Err(StoreError::Conflict(format!(
                    "An event with slug {} already exists",
                    new.slug
                )));
            }

            let row = Event {
                event_id: EventId::new(),
                name,
                slug: new.slug,
                start_time: new.start_time,
                end_time: new.end_time,
                is_hackathon: new.is_hackathon,
                hackathon_state: HackathonState::default(),
                hack_started_at: None,
                hack_until: None,
                vote_started_at: None,
                vote_until: None,
            };
            t.events.insert(row.event_id, row.clone());
            Ok((row.clone(), vec![(ChangeOp::Insert, RowData::Event(row))]))
        })
    }

    /// Register a team. The creating user becomes its first member, in the
    /// same transaction.
    pub fn create_team(
        &self,
        event_id: EventId,
        new: NewHack,
        creator: UserId,
    ) -> Result<(Hack, Txid), StoreError> {
        let now = Utc::now();
        self.transaction(|t| {
            let event = t
                .events
                .get(&event_id)
                .ok_or(StoreError::NotFound("hackathon event"))?;
            rules::event_accepts_teams(event.is_hackathon, event.end_time, now)?;
            let team_name = rules::valid_name(&new.team_name)?.to_string();

            let hack = Hack {
                hack_id: HackId::new(),
                event_id,
                team_name,
                project_name: new.project_name,
                project_description: new.project_description,
                project_url: new.project_url,
                team_image: new.team_image,
                created_at: now,
            };
            let membership = HackUser {
                hack_id: hack.hack_id,
                user_id: creator,
                joined_at: now,
            };

            t.hacks.insert(hack.hack_id, hack.clone());
            t.hack_users
                .insert((hack.hack_id, creator), membership.clone());

            Ok((
                hack.clone(),
                vec![
                    (ChangeOp::Insert, RowData::Hack(hack)),
                    (ChangeOp::Insert, RowData::HackUser(membership)),
                ],
            ))
        })
    }

    pub fn add_member(
        &self,
        hack_id: HackId,
        user_id: UserId,
        actor: Actor,
    ) -> Result<(HackUser, Txid), StoreError> {
        self.transaction(|t| {
            if !actor.may_act_for(user_id) {
                return Err(StoreError::Forbidden);
            }
            if !t.hacks.contains_key(&hack_id) {
                return Err(StoreError::NotFound("team"));
            }
            rules::unique_membership(t.hack_users.keys().copied(), &hack_id, &user_id)?;

            let membership = HackUser {
                hack_id,
                user_id,
                joined_at: Utc::now(),
            };
            t.hack_users
                .insert((hack_id, user_id), membership.clone());
            Ok((
                membership.clone(),
                vec![(ChangeOp::Insert, RowData::HackUser(membership))],
            ))
        })
    }

    pub fn remove_member(
        &self,
        hack_id: HackId,
        user_id: UserId,
        actor: Actor,
    ) -> Result<((), Txid), StoreError> {
        self.transaction(|t| {
            if !actor.may_act_for(user_id) {
                return Err(StoreError::Forbidden);
            }
            let removed = t
                .hack_users
                .remove(&(hack_id, user_id))
                .ok_or(StoreError::NotFound("membership"))?;
            Ok(((), vec![(ChangeOp::Delete, RowData::HackUser(removed))]))
        })
    }

    /// Delete a team. Non-admins must be members and are blocked once any
    /// vote references the team. The admin path cascades as an ordered list
    /// of delete steps (votes, then memberships, then the hack) within this
    /// one transaction.
    pub fn delete_team(&self, hack_id: HackId, actor: Actor) -> Result<((), Txid), StoreError> {
        self.transaction(|t| {
            if !t.hacks.contains_key(&hack_id) {
                return Err(StoreError::NotFound("team"));
            }
            let is_member = t.hack_users.contains_key(&(hack_id, actor.user_id));
            if !is_member && !actor.is_admin {
                return Err(StoreError::Forbidden);
            }
            rules::deletable_team(t.vote_count_for_hack(hack_id), actor.is_admin)?;

            let mut changes = Vec::new();

            let vote_keys: Vec<_> = t
                .hack_votes
                .keys()
                .filter(|(h, _, _)| *h == hack_id)
                .copied()
                .collect();
            for key in vote_keys {
                let vote = t.hack_votes.remove(&key).unwrap();
                changes.push((ChangeOp::Delete, RowData::HackVote(vote)));
            }

            let member_keys: Vec<_> = t
                .hack_users
                .keys()
                .filter(|(h, _)| *h == hack_id)
                .copied()
                .collect();
            for key in member_keys {
                let membership = t.hack_users.remove(&key).unwrap();
                changes.push((ChangeOp::Delete, RowData::HackUser(membership)));
            }

            let hack = t.hacks.remove(&hack_id).unwrap();
            changes.push((ChangeOp::Delete, RowData::Hack(hack)));

            Ok(((), changes))
        })
    }

    pub fn cast_vote(
        &self,
        hack_id: HackId,
        award_id: AwardId,
        user_id: UserId,
    ) -> Result<(HackVote, Txid), StoreError> {
        let now = Utc::now();
        self.transaction(|t| {
            let hack = t.hacks.get(&hack_id).ok_or(StoreError::NotFound("team"))?;
            let award = t
                .awards
                .get(&award_id)
                .ok_or(StoreError::NotFound("award"))?;
            rules::same_event(&award.event_id, &hack.event_id)?;

            // The voting deadline is enforced here, authoritatively, not just
            // in the UI.
            if let Some(event) = t.events.get(&hack.event_id) {
                rules::within_voting_window(event.vote_until, now)?;
            }

            rules::unique_vote(t.hack_votes.keys().copied(), &hack_id, &award_id, &user_id)?;

            let vote = HackVote {
                hack_id,
                award_id,
                user_id,
                cast_at: now,
            };
            t.hack_votes
                .insert((hack_id, award_id, user_id), vote.clone());
            Ok((
                vote.clone(),
                vec![(ChangeOp::Insert, RowData::HackVote(vote))],
            ))
        })
    }

    pub fn retract_vote(
        &self,
        hack_id: HackId,
        award_id: AwardId,
        user_id: UserId,
        actor: Actor,
    ) -> Result<((), Txid), StoreError> {
        self.transaction(|t| {
            if !actor.may_act_for(user_id) {
                return Err(StoreError::Forbidden);
            }
            let removed = t
                .hack_votes
                .remove(&(hack_id, award_id, user_id))
                .ok_or(StoreError::NotFound("vote"))?;
            Ok(((), vec![(ChangeOp::Delete, RowData::HackVote(removed))]))
        })
    }

    pub fn create_award(
        &self,
        event_id: EventId,
        new: NewAward,
    ) -> Result<(Award, Txid), StoreError> {
        self.transaction(|t| {
            if !t.events.contains_key(&event_id) {
                return Err(StoreError::NotFound("event"));
            }
            let name = rules::valid_name(&new.name)?.to_string();

            let award = Award {
                award_id: AwardId::new(),
                event_id,
                name,
            };
            t.awards.insert(award.award_id, award.clone());
            Ok((
                award.clone(),
                vec![(ChangeOp::Insert, RowData::Award(award))],
            ))
        })
    }

    pub fn update_award(&self, award_id: AwardId, name: &str) -> Result<(Award, Txid), StoreError> {
        self.transaction(|t| {
            let name = rules::valid_name(name)?.to_string();
            let award = t
                .awards
                .get_mut(&award_id)
                .ok_or(StoreError::NotFound("award"))?;
            award.name = name;
            let award = award.clone();
            Ok((
                award.clone(),
                vec![(ChangeOp::Update, RowData::Award(award))],
            ))
        })
    }

    pub fn delete_award(&self, award_id: AwardId) -> Result<((), Txid), StoreError> {
        self.transaction(|t| {
            if !t.awards.contains_key(&award_id) {
                return Err(StoreError::NotFound("award"));
            }
            rules::deletable_award(t.vote_count_for_award(award_id))?;
            let removed = t.awards.remove(&award_id).unwrap();
            Ok(((), vec![(ChangeOp::Delete, RowData::Award(removed))]))
        })
    }

    /// Apply a lifecycle transition. Entering `hacking` stamps
    /// `hack_started_at` exactly once; entering `voting` stamps
    /// `vote_started_at` once. Repeat transitions to the current state are
    /// idempotent.
    pub fn set_hackathon_state(
        &self,
        event_id: EventId,
        new_state: HackathonState,
        hack_until: Deadline,
        vote_until: Deadline,
    ) -> Result<(Event, Txid), StoreError> {
        let now = Utc::now();
        self.transaction(|t| {
            let ev = t
                .events
                .get_mut(&event_id)
                .ok_or(StoreError::NotFound("event"))?;
            if !ev.is_hackathon {
                return Err(StoreError::NotFound("hackathon event"));
            }

            fn rank(s: HackathonState) -> u8 {
                match s {
                    HackathonState::BeforeStart => 0,
                    HackathonState::Hacking => 1,
                    HackathonState::Voting => 2,
                    HackathonState::Ended => 3,
                }
            }
            if rank(new_state) < rank(ev.hackathon_state) {
                event!(
                    Level::WARN,
                    event_id = %event_id,
                    from = %ev.hackathon_state,
                    to = %new_state,
                    "hackathon state moved backward"
                );
            }

            ev.hackathon_state = new_state;
            if new_state == HackathonState::Hacking && ev.hack_started_at.is_none() {
                ev.hack_started_at = Some(now);
            }
            if new_state == HackathonState::Voting && ev.vote_started_at.is_none() {
                ev.vote_started_at = Some(now);
            }
            ev.hack_until = hack_until.apply(ev.hack_until);
            ev.vote_until = vote_until.apply(ev.vote_until);

            let ev = ev.clone();
            Ok((ev.clone(), vec![(ChangeOp::Update, RowData::Event(ev))]))
        })
    }

    // Read-side snapshots. These serve gateway queries; replicas read their
    // own mirror instead.

    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.tables.read().unwrap().events.get(&event_id).cloned()
    }

    pub fn event_by_slug(&self, slug: &str) -> Option<Event> {
        self.tables
            .read()
            .unwrap()
            .events
            .values()
            .find(|e| e.slug == slug)
            .cloned()
    }

    pub fn hack(&self, hack_id: HackId) -> Option<Hack> {
        self.tables.read().unwrap().hacks.get(&hack_id).cloned()
    }

    pub fn hacks_for_event(&self, event_id: EventId) -> Vec<Hack> {
        let tables = self.tables.read().unwrap();
        let mut hacks: Vec<_> = tables
            .hacks
            .values()
            .filter(|h| h.event_id == event_id)
            .cloned()
            .collect();
        hacks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        hacks
    }

    pub fn members_of(&self, hack_id: HackId) -> Vec<HackUser> {
        let tables = self.tables.read().unwrap();
        let mut members: Vec<_> = tables
            .hack_users
            .values()
            .filter(|m| m.hack_id == hack_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        members
    }

    pub fn awards_for_event(&self, event_id: EventId) -> Vec<Award> {
        let tables = self.tables.read().unwrap();
        let mut awards: Vec<_> = tables
            .awards
            .values()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect();
        awards.sort_by(|a, b| a.name.cmp(&b.name));
        awards
    }

    pub fn votes_for_hack(&self, hack_id: HackId) -> Vec<HackVote> {
        let tables = self.tables.read().unwrap();
        tables
            .hack_votes
            .values()
            .filter(|v| v.hack_id == hack_id)
            .cloned()
            .collect()
    }

    /// Per-award vote tallies for one event, each award's hacks ordered by
    /// vote count descending.
    pub fn results(&self, event_id: EventId) -> Result<Vec<AwardTally>, StoreError> {
        let tables = self.tables.read().unwrap();
        if !tables.events.contains_key(&event_id) {
            return Err(StoreError::NotFound("event"));
        }

        let hacks: Vec<&Hack> = tables
            .hacks
            .values()
            .filter(|h| h.event_id == event_id)
            .collect();

        let mut awards: Vec<&Award> = tables
            .awards
            .values()
            .filter(|a| a.event_id == event_id)
            .collect();
        awards.sort_by(|a, b| a.name.cmp(&b.name));

        let results = awards
            .into_iter()
            .map(|award| {
                let mut tallies: Vec<HackTally> = hacks
                    .iter()
                    .map(|hack| HackTally {
                        hack_id: hack.hack_id,
                        team_name: hack.team_name.clone(),
                        votes: tables
                            .hack_votes
                            .keys()
                            .filter(|(h, a, _)| *h == hack.hack_id && *a == award.award_id)
                            .count(),
                    })
                    .collect();
                tallies.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.team_name.cmp(&b.team_name)));
                AwardTally {
                    award: award.clone(),
                    tallies,
                }
            })
            .collect();

        Ok(results)
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish_non_exhaustive()
    }
}
