use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ERASE_ERROR_TABLE_NAME: &str = "erase_errors";

/// Status code of a delete for a tweet that no longer exists. Such failures
/// are permanent and never retried.
pub const STATUS_NOT_FOUND: u16 = 404;

/// A failed delete as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseError {
    pub id: u64,
    pub tried_twitter_user_id: Option<u64>,
    pub twitter_tweet_id: u64,
    /// HTTP status of the failed call, 0 when the failure had none
    pub status_code: u16,
    pub error_message: String,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl EraseError {
    pub fn is_permanent(&self) -> bool {
        self.status_code == STATUS_NOT_FOUND
    }
}

/// Insert payload for [`EraseError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEraseError {
    pub tried_twitter_user_id: Option<u64>,
    pub twitter_tweet_id: u64,
    pub status_code: u16,
    pub error_message: String,
}
