use std::{sync::Arc, time::Duration};

use hackvote_db::DurableStore;

#[derive(Debug)]
pub struct InnerState {
    pub production: bool,
    pub store: Arc<DurableStore>,
    /// Cap on how long a change feed long-poll holds its request open.
    pub feed_poll_timeout: Duration,
}

pub type AppState = Arc<InnerState>;
