use serde::{Deserialize, Serialize};

/// Sequence number of one poll tick within a single poller's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick {
    pub seq: u64,
}

pub const POLL_INTERVAL_MS: u64 = 2000;

impl Tick {
    pub fn new() -> Self {
        Tick { seq: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { seq: self.seq + 1 }
    }
}

impl Default for Tick {
    fn default() -> Self {
        Self::new()
    }
}
