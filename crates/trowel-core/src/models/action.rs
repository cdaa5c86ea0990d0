//! Change-history action

use serde::{Deserialize, Serialize};

use crate::util::unix_millis_now;

/// One entry of a document's change history
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// Name of the acting user
    pub user: String,
    /// Timestamp (Unix ms)
    pub date: i64,
}

impl Action {
    pub fn new(user: impl Into<String>, date: i64) -> Self {
        Self {
            user: user.into(),
            date,
        }
    }

    /// Action stamped with the current time
    #[must_use]
    pub fn now(user: impl Into<String>) -> Self {
        Self::new(user, unix_millis_now())
    }
}
