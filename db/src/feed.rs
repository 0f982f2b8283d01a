//! The change feed: an append-only log of committed row changes.
//!
//! Each event carries the transaction id issued by the store for the commit
//! that produced it. The cursor is the log index, so a subscriber that
//! reconnects can resume exactly where it left off, and cursor 0 replays the
//! whole history (which doubles as initial sync for a fresh replica).

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::row::{ChangeEvent, TableName};

pub type Cursor = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedBatch {
    pub events: Vec<ChangeEvent>,
    /// Position to pass to the next fetch.
    pub cursor: Cursor,
}

#[derive(Default)]
pub struct ChangeFeed {
    log: RwLock<Vec<ChangeEvent>>,
    notify: Notify,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append committed events. The store calls this while still holding its
    /// write lock, so feed order always equals commit order.
    pub(crate) fn publish(&self, events: Vec<ChangeEvent>) {
        if events.is_empty() {
            return;
        }
        {
            let mut log = self.log.write().unwrap();
            log.extend(events);
        }
        self.notify.notify_waiters();
    }

    pub fn cursor(&self) -> Cursor {
        self.log.read().unwrap().len() as Cursor
    }

    /// Fetch events past `cursor`, optionally restricted to a table set. The
    /// returned cursor always advances past everything scanned, including
    /// filtered-out events.
    pub fn events_after(&self, cursor: Cursor, tables: Option<&HashSet<TableName>>) -> FeedBatch {
        let log = self.log.read().unwrap();
        let start = (cursor as usize).min(log.len());
        let events = log[start..]
            .iter()
            .filter(|ev| tables.map_or(true, |t| t.contains(&ev.row.table())))
            .cloned()
            .collect();
        FeedBatch {
            events,
            cursor: log.len() as Cursor,
        }
    }

    /// Long-poll variant of [`events_after`](Self::events_after): waits until
    /// a matching event lands past the cursor, or until the timeout expires,
    /// in which case the batch is empty.
    pub async fn wait_after(
        &self,
        cursor: Cursor,
        tables: Option<&HashSet<TableName>>,
        timeout: Duration,
    ) -> FeedBatch {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut cursor = cursor;
        loop {
            // Register for wakeup before scanning so a publish between the
            // scan and the await is not missed.
            let notified = self.notify.notified();
            let batch = self.events_after(cursor, tables);
            if !batch.events.is_empty() {
                return batch;
            }
            cursor = batch.cursor;

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return FeedBatch {
                    events: Vec::new(),
                    cursor,
                };
            }
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("len", &self.cursor())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hack_votes::HackVote;
    use crate::object_id::{AwardId, HackId, UserId};
    use crate::row::{ChangeOp, RowData};

    fn vote_event(txid: u64) -> ChangeEvent {
        ChangeEvent {
            txid,
            op: ChangeOp::Insert,
            row: RowData::HackVote(HackVote {
                hack_id: HackId::new(),
                award_id: AwardId::new(),
                user_id: UserId::new(),
                cast_at: chrono::Utc::now(),
            }),
        }
    }

    #[test]
    fn cursor_resume_returns_only_missed_events() {
        let feed = ChangeFeed::new();
        feed.publish(vec![vote_event(1), vote_event(2)]);

        let first = feed.events_after(0, None);
        assert_eq!(first.events.len(), 2);
        assert_eq!(first.cursor, 2);

        feed.publish(vec![vote_event(3)]);
        let second = feed.events_after(first.cursor, None);
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.events[0].txid, 3);
    }

    #[test]
    fn table_filter_still_advances_cursor() {
        let feed = ChangeFeed::new();
        feed.publish(vec![vote_event(1)]);

        let only_hacks: HashSet<TableName> = [TableName::Hacks].into_iter().collect();
        let batch = feed.events_after(0, Some(&only_hacks));
        assert!(batch.events.is_empty());
        assert_eq!(batch.cursor, 1, "filtered events are still consumed");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_after_times_out_with_empty_batch() {
        let feed = ChangeFeed::new();
        let batch = feed.wait_after(0, None, Duration::from_secs(1)).await;
        assert!(batch.events.is_empty());
        assert_eq!(batch.cursor, 0);
    }

    #[tokio::test]
    async fn wait_after_wakes_on_publish() {
        let feed = std::sync::Arc::new(ChangeFeed::new());

        let waiter = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.wait_after(0, None, Duration::from_secs(30)).await })
        };

        tokio::task::yield_now().await;
        feed.publish(vec![vote_event(9)]);

        let batch = waiter.await.unwrap();
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.events[0].txid, 9);
    }
}
