//! The replica session: a client-side, queryable mirror of the synchronized
//! tables with an optimistic overlay for the client's own unconfirmed
//! mutations.
//!
//! A session is an explicitly constructed object with a start/stop lifecycle.
//! It owns its own subscription cursor, mirror, and overlay, so several
//! independent sessions can coexist in one process.
//!
//! Submission pipeline for one mutation:
//! 1. the overlay entry is applied synchronously, so a read issued right
//!    after submit already sees the change;
//! 2. the gateway call runs in a background task;
//! 3. a rejected call (including transport failure) removes the overlay
//!    entry and reports the error kind; a rejected optimistic write is
//!    never kept;
//! 4. an accepted call registers the returned txid, and the overlay entry is
//!    dropped once the feed has delivered that txid for every required
//!    table;
//! 5. if confirmation does not arrive within the bound, the handle reports
//!    Unsynced. The optimistic write stays applied, and a late feed
//!    catch-up still completes the reconciliation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::Future;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{event, Level};

use hackvote_db::{
    awards::Award,
    events::Event,
    hack_users::HackUser,
    hack_votes::HackVote,
    hacks::{Hack, NewHack},
    object_id::{AwardId, EventId, HackId, UserId},
    Cursor, RowData, RowKey, TableName, Txid,
};
use hackvote_rules as rules;
use thiserror::Error;

use crate::feed_client::ChangeFeedClient;
use crate::gateway::{GatewayClient, GatewayError};
use crate::overlay::{OverlayEntry, RowOp, TableMirror};

#[derive(Debug, Error)]
pub enum ReplicaError {
    /// An advisory invariant check failed against the merged local view.
    /// Nothing was submitted; the gateway would have rejected it anyway.
    #[error(transparent)]
    Advisory(#[from] rules::Violation),
}

#[derive(Debug, Clone)]
pub enum MutationStatus {
    Pending,
    Confirmed {
        txid: Txid,
    },
    /// The gateway rejected the mutation and the overlay entry was rolled
    /// back.
    Rejected(GatewayError),
    /// The gateway committed the mutation but the feed did not confirm it
    /// within the bound. The optimistic write is still applied, only flagged.
    Unsynced {
        txid: Txid,
    },
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Observer for one submitted mutation.
#[derive(Debug)]
pub struct MutationHandle {
    id: u64,
    rx: watch::Receiver<MutationStatus>,
}

impl MutationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> MutationStatus {
        self.rx.borrow().clone()
    }

    /// Wait until the mutation leaves the Pending state. Note that an
    /// Unsynced result can still transition to Confirmed later; poll
    /// [`status`](Self::status) or keep waiting if that matters.
    pub async fn wait(&mut self) -> MutationStatus {
        loop {
            let current = self.rx.borrow().clone();
            if !current.is_pending() {
                return current;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}

struct PendingMutation {
    sender: watch::Sender<MutationStatus>,
    txid: Option<Txid>,
    required: Vec<TableName>,
}

#[derive(Default)]
struct SessionState {
    mirror: TableMirror,
    overlay: Vec<OverlayEntry>,
    pending: HashMap<u64, PendingMutation>,
    /// Tables seen on the feed per txid, for confirmation matching. A feed
    /// event can arrive before its gateway response, so this records every
    /// txid, not just registered ones.
    seen: HashMap<Txid, HashSet<TableName>>,
    cursor: Cursor,
}

fn try_confirm(state: &mut SessionState, id: u64) -> bool {
    let Some(pending) = state.pending.get(&id) else {
        return true;
    };
    let Some(txid) = pending.txid else {
        return false;
    };
    let satisfied = pending.required.iter().all(|table| {
        state
            .seen
            .get(&txid)
            .map_or(false, |tables| tables.contains(table))
    });
    if !satisfied {
        return false;
    }

    let pending = state.pending.remove(&id).unwrap();
    pending.sender.send(MutationStatus::Confirmed { txid }).ok();
    state.overlay.retain(|entry| entry.id != id);
    state.seen.remove(&txid);
    true
}

fn prune_seen(state: &mut SessionState) {
    const MAX_SEEN: usize = 1024;
    if state.seen.len() <= MAX_SEEN {
        return;
    }
    let protected: HashSet<Txid> = state.pending.values().filter_map(|p| p.txid).collect();
    let mut txids: Vec<Txid> = state
        .seen
        .keys()
        .copied()
        .filter(|t| !protected.contains(t))
        .collect();
    txids.sort_unstable();
    let excess = state.seen.len() - MAX_SEEN;
    for txid in txids.into_iter().take(excess) {
        state.seen.remove(&txid);
    }
}

pub struct ReplicaSession {
    state: Arc<Mutex<SessionState>>,
    /// Pinged whenever the mirror advances or an overlay entry resolves.
    changed: Arc<Notify>,
    gateway: Arc<dyn GatewayClient>,
    feed: Arc<dyn ChangeFeedClient>,
    user_id: UserId,
    is_admin: bool,
    confirm_timeout: Duration,
    tables: Option<HashSet<TableName>>,
    next_id: AtomicU64,
    feed_task: Mutex<Option<JoinHandle<()>>>,
}

impl ReplicaSession {
    pub fn new(
        user_id: UserId,
        gateway: Arc<dyn GatewayClient>,
        feed: Arc<dyn ChangeFeedClient>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            changed: Arc::new(Notify::new()),
            gateway,
            feed,
            user_id,
            is_admin: false,
            confirm_timeout: Duration::from_secs(10),
            tables: None,
            next_id: AtomicU64::new(1),
            feed_task: Mutex::new(None),
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// Restrict the subscription to a table subset. The default subscribes
    /// to every table, which doubles as initial sync from cursor 0.
    pub fn with_tables(mut self, tables: HashSet<TableName>) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Spawn the feed consumer. Idempotent.
    pub fn start(&self) {
        let mut task = self.feed_task.lock().unwrap();
        if task.is_some() {
            return;
        }

        let state = self.state.clone();
        let changed = self.changed.clone();
        let feed = self.feed.clone();
        let tables = self.tables.clone();

        *task = Some(tokio::spawn(async move {
            loop {
                let cursor = state.lock().unwrap().cursor;
                match feed.next_batch(cursor, tables.as_ref()).await {
                    Ok(batch) => {
                        let mut st = state.lock().unwrap();
                        for ev in &batch.events {
                            st.mirror.apply_event(ev);
                            st.seen.entry(ev.txid).or_default().insert(ev.row.table());
                        }
                        st.cursor = batch.cursor;

                        let ids: Vec<u64> = st.pending.keys().copied().collect();
                        for id in ids {
                            try_confirm(&mut st, id);
                        }
                        prune_seen(&mut st);
                        drop(st);
                        changed.notify_waiters();
                    }
                    Err(err) => {
                        event!(Level::WARN, error = %err, "change feed fetch failed");
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                }
            }
        }));
    }

    pub fn stop(&self) {
        if let Some(task) = self.feed_task.lock().unwrap().take() {
            task.abort();
        }
    }

    fn submit<F>(&self, ops: Vec<RowOp>, required: Vec<TableName>, call: F) -> MutationHandle
    where
        F: Future<Output = Result<Txid, GatewayError>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, rx) = watch::channel(MutationStatus::Pending);

        {
            let mut st = self.state.lock().unwrap();
            st.overlay.push(OverlayEntry { id, ops });
            st.pending.insert(
                id,
                PendingMutation {
                    sender,
                    txid: None,
                    required,
                },
            );
        }

        let state = self.state.clone();
        let changed = self.changed.clone();
        let timeout = self.confirm_timeout;

        tokio::spawn(async move {
            match call.await {
                Err(err) => {
                    // The gateway said no (or never answered): the optimistic
                    // write must not survive.
                    let mut st = state.lock().unwrap();
                    st.overlay.retain(|entry| entry.id != id);
                    if let Some(pending) = st.pending.remove(&id) {
                        pending.sender.send(MutationStatus::Rejected(err)).ok();
                    }
                    drop(st);
                    changed.notify_waiters();
                }
                Ok(txid) => {
                    let deadline = tokio::time::Instant::now() + timeout;
                    {
                        let mut st = state.lock().unwrap();
                        if let Some(pending) = st.pending.get_mut(&id) {
                            pending.txid = Some(txid);
                        }
                        // The feed may already have delivered this txid.
                        try_confirm(&mut st, id);
                    }

                    loop {
                        let notified = changed.notified();
                        if !state.lock().unwrap().pending.contains_key(&id) {
                            return;
                        }
                        if tokio::time::timeout_at(deadline, notified).await.is_err() {
                            let st = state.lock().unwrap();
                            if let Some(pending) = st.pending.get(&id) {
                                event!(
                                    Level::WARN,
                                    mutation = id,
                                    txid,
                                    "mutation not confirmed within bound"
                                );
                                pending.sender.send(MutationStatus::Unsynced { txid }).ok();
                            }
                            // The registration stays; a late feed catch-up
                            // still completes the reconciliation.
                            return;
                        }
                    }
                }
            }
        });

        MutationHandle { id, rx }
    }

    fn merged(&self, table: TableName) -> Vec<RowData> {
        let st = self.state.lock().unwrap();
        st.mirror.merged_rows(table, &st.overlay)
    }

    // Queries over the merged view.

    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.merged(TableName::Events)
            .into_iter()
            .find_map(|row| match row {
                RowData::Event(e) if e.event_id == event_id => Some(e),
                _ => None,
            })
    }

    pub fn hack(&self, hack_id: HackId) -> Option<Hack> {
        self.merged(TableName::Hacks)
            .into_iter()
            .find_map(|row| match row {
                RowData::Hack(h) if h.hack_id == hack_id => Some(h),
                _ => None,
            })
    }

    pub fn hacks_for_event(&self, event_id: EventId) -> Vec<Hack> {
        let mut hacks: Vec<Hack> = self
            .merged(TableName::Hacks)
            .into_iter()
            .filter_map(|row| match row {
                RowData::Hack(h) if h.event_id == event_id => Some(h),
                _ => None,
            })
            .collect();
        hacks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        hacks
    }

    pub fn members_of(&self, hack_id: HackId) -> Vec<HackUser> {
        let mut members: Vec<HackUser> = self
            .merged(TableName::HackUsers)
            .into_iter()
            .filter_map(|row| match row {
                RowData::HackUser(m) if m.hack_id == hack_id => Some(m),
                _ => None,
            })
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        members
    }

    pub fn awards_for_event(&self, event_id: EventId) -> Vec<Award> {
        let mut awards: Vec<Award> = self
            .merged(TableName::Awards)
            .into_iter()
            .filter_map(|row| match row {
                RowData::Award(a) if a.event_id == event_id => Some(a),
                _ => None,
            })
            .collect();
        awards.sort_by(|a, b| a.name.cmp(&b.name));
        awards
    }

    pub fn votes(&self) -> Vec<HackVote> {
        self.merged(TableName::HackVotes)
            .into_iter()
            .filter_map(|row| match row {
                RowData::HackVote(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn votes_for_hack(&self, hack_id: HackId) -> Vec<HackVote> {
        self.votes()
            .into_iter()
            .filter(|v| v.hack_id == hack_id)
            .collect()
    }

    pub fn cursor(&self) -> Cursor {
        self.state.lock().unwrap().cursor
    }

    /// Number of unconfirmed overlay entries, including unsynced ones.
    pub fn overlay_len(&self) -> usize {
        self.state.lock().unwrap().overlay.len()
    }

    // Mutations. Each runs the advisory invariant checks against the merged
    // view first; the gateway re-validates authoritatively either way.

    /// Register a team; the session user becomes its first member. The
    /// returned hack carries a provisional id that is replaced by the
    /// confirmed row once the feed catches up.
    pub fn create_team(
        &self,
        event_id: EventId,
        new: NewHack,
    ) -> Result<(Hack, MutationHandle), ReplicaError> {
        rules::valid_name(&new.team_name)?;
        if let Some(event) = self.event(event_id) {
            rules::event_accepts_teams(event.is_hackathon, event.end_time, Utc::now())?;
        }

        let now = Utc::now();
        let hack = Hack {
            hack_id: HackId::new(),
            event_id,
            team_name: new.team_name.trim().to_string(),
            project_name: new.project_name.clone(),
            project_description: new.project_description.clone(),
            project_url: new.project_url.clone(),
            team_image: new.team_image.clone(),
            created_at: now,
        };
        let membership = HackUser {
            hack_id: hack.hack_id,
            user_id: self.user_id,
            joined_at: now,
        };

        let gateway = self.gateway.clone();
        let handle = self.submit(
            vec![
                RowOp::Upsert(RowData::Hack(hack.clone())),
                RowOp::Upsert(RowData::HackUser(membership)),
            ],
            vec![TableName::Hacks, TableName::HackUsers],
            async move {
                gateway
                    .create_team(event_id, new)
                    .await
                    .map(|(_, txid)| txid)
            },
        );
        Ok((hack, handle))
    }

    pub fn join_team(&self, hack_id: HackId) -> Result<MutationHandle, ReplicaError> {
        let memberships: Vec<(HackId, UserId)> = self
            .merged(TableName::HackUsers)
            .into_iter()
            .filter_map(|row| match row {
                RowData::HackUser(m) => Some((m.hack_id, m.user_id)),
                _ => None,
            })
            .collect();
        rules::unique_membership(memberships, &hack_id, &self.user_id)?;

        let membership = HackUser {
            hack_id,
            user_id: self.user_id,
            joined_at: Utc::now(),
        };
        let gateway = self.gateway.clone();
        let user_id = self.user_id;
        Ok(self.submit(
            vec![RowOp::Upsert(RowData::HackUser(membership))],
            vec![TableName::HackUsers],
            async move {
                gateway
                    .add_member(hack_id, user_id)
                    .await
                    .map(|(_, txid)| txid)
            },
        ))
    }

    pub fn leave_team(&self, hack_id: HackId) -> MutationHandle {
        let gateway = self.gateway.clone();
        let user_id = self.user_id;
        self.submit(
            vec![RowOp::Delete(RowKey::HackUser(hack_id, user_id))],
            vec![TableName::HackUsers],
            async move { gateway.remove_member(hack_id, user_id).await },
        )
    }

    pub fn cast_vote(
        &self,
        hack_id: HackId,
        award_id: AwardId,
    ) -> Result<MutationHandle, ReplicaError> {
        let awards = self.merged(TableName::Awards);
        let award = awards.iter().find_map(|row| match row {
            RowData::Award(a) if a.award_id == award_id => Some(a),
            _ => None,
        });
        if let (Some(hack), Some(award)) = (self.hack(hack_id), award) {
            rules::same_event(&award.event_id, &hack.event_id)?;
            if let Some(event) = self.event(hack.event_id) {
                rules::within_voting_window(event.vote_until, Utc::now())?;
            }
        }

        let votes: Vec<(HackId, AwardId, UserId)> = self
            .votes()
            .into_iter()
            .map(|v| (v.hack_id, v.award_id, v.user_id))
            .collect();
        rules::unique_vote(votes, &hack_id, &award_id, &self.user_id)?;

        let vote = HackVote {
            hack_id,
            award_id,
            user_id: self.user_id,
            cast_at: Utc::now(),
        };
        let gateway = self.gateway.clone();
        Ok(self.submit(
            vec![RowOp::Upsert(RowData::HackVote(vote))],
            vec![TableName::HackVotes],
            async move {
                gateway
                    .cast_vote(hack_id, award_id)
                    .await
                    .map(|(_, txid)| txid)
            },
        ))
    }

    pub fn retract_vote(&self, hack_id: HackId, award_id: AwardId) -> MutationHandle {
        let gateway = self.gateway.clone();
        let user_id = self.user_id;
        self.submit(
            vec![RowOp::Delete(RowKey::HackVote(hack_id, award_id, user_id))],
            vec![TableName::HackVotes],
            async move { gateway.retract_vote(hack_id, award_id).await },
        )
    }

    /// Delete a team. The optimistic overlay mirrors the server-side cascade
    /// over the rows currently visible in the merged view.
    pub fn delete_team(&self, hack_id: HackId) -> Result<MutationHandle, ReplicaError> {
        rules::deletable_team(self.votes_for_hack(hack_id).len(), self.is_admin)?;

        let mut ops: Vec<RowOp> = self
            .votes_for_hack(hack_id)
            .into_iter()
            .map(|v| RowOp::Delete(RowKey::HackVote(v.hack_id, v.award_id, v.user_id)))
            .collect();
        ops.extend(
            self.members_of(hack_id)
                .into_iter()
                .map(|m| RowOp::Delete(RowKey::HackUser(m.hack_id, m.user_id))),
        );
        ops.push(RowOp::Delete(RowKey::Hack(hack_id)));

        let gateway = self.gateway.clone();
        Ok(self.submit(
            ops,
            // Only the hack row is guaranteed to emit; the cascaded rows
            // share its txid and arrive in the same batch when present.
            vec![TableName::Hacks],
            async move { gateway.delete_team(hack_id).await },
        ))
    }
}

impl Drop for ReplicaSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ReplicaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaSession")
            .field("user_id", &self.user_id)
            .field("cursor", &self.cursor())
            .field("overlay_len", &self.overlay_len())
            .finish_non_exhaustive()
    }
}
