//! Confirmed mirror and optimistic overlay.
//!
//! The mirror holds the last row value per key as delivered by the change
//! feed. The overlay is an ordered list of not-yet-confirmed local mutations;
//! a read clones the mirror and replays the overlay in submission order, so
//! the caller always sees its own unconfirmed writes.

use std::collections::HashMap;

use hackvote_db::{ChangeEvent, ChangeOp, RowData, RowKey, TableName};

#[derive(Debug, Clone)]
pub enum RowOp {
    Upsert(RowData),
    Delete(RowKey),
}

impl RowOp {
    pub fn table(&self) -> TableName {
        match self {
            Self::Upsert(row) => row.table(),
            Self::Delete(key) => key.table(),
        }
    }

    fn apply(&self, rows: &mut HashMap<RowKey, RowData>) {
        match self {
            Self::Upsert(row) => {
                rows.insert(row.key(), row.clone());
            }
            Self::Delete(key) => {
                rows.remove(key);
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct OverlayEntry {
    pub id: u64,
    pub ops: Vec<RowOp>,
}

#[derive(Debug, Default)]
pub(crate) struct TableMirror {
    tables: HashMap<TableName, HashMap<RowKey, RowData>>,
}

impl TableMirror {
    pub fn apply_event(&mut self, ev: &ChangeEvent) {
        let rows = self.tables.entry(ev.row.table()).or_default();
        match ev.op {
            ChangeOp::Insert | ChangeOp::Update => {
                rows.insert(ev.row.key(), ev.row.clone());
            }
            ChangeOp::Delete => {
                rows.remove(&ev.row.key());
            }
        }
    }

    /// Confirmed rows of one table with the overlay replayed on top, in
    /// submission order.
    pub fn merged_rows(&self, table: TableName, overlay: &[OverlayEntry]) -> Vec<RowData> {
        let mut rows = self.tables.get(&table).cloned().unwrap_or_default();
        for entry in overlay {
            for op in entry.ops.iter().filter(|op| op.table() == table) {
                op.apply(&mut rows);
            }
        }
        rows.into_values().collect()
    }
}
