use serde::{Deserialize, Serialize};

use super::session::SessionId;

/// Identity tag carried by every async operation.
///
/// `generation` is bumped by the manager each time a session is created, so a
/// result whose epoch differs from the current one belongs to a superseded
/// session and must not touch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionEpoch {
    pub generation: u64,
    pub session: SessionId,
}

impl SessionEpoch {
    pub fn first(session: SessionId) -> Self {
        Self { generation: 0, session }
    }

    pub fn succeed(&self, session: SessionId) -> Self {
        Self {
            generation: self.generation + 1,
            session,
        }
    }
}
