mod enums;

pub mod awards;
pub mod events;
pub mod feed;
pub mod hack_users;
pub mod hack_votes;
pub mod hacks;
pub mod object_id;
pub mod row;
pub mod store;

pub use enums::*;
pub use feed::{ChangeFeed, Cursor, FeedBatch};
pub use row::{ChangeEvent, ChangeOp, RowData, RowKey, TableName, Txid};
pub use store::{Actor, AwardTally, Deadline, DurableStore, HackTally, StoreError};

pub fn new_uuid() -> uuid::Uuid {
    ulid::Ulid::new().into()
}
