use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ERASE_TWEET_TABLE_NAME: &str = "erase_tweets";

/// A tweet confirmed deleted by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseTweet {
    pub id: u64,
    pub twitter_user_id: Option<u64>,
    pub twitter_tweet_id: u64,
    pub tweet: String,
    pub posted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`EraseTweet`]; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEraseTweet {
    pub twitter_user_id: Option<u64>,
    pub twitter_tweet_id: u64,
    pub tweet: String,
    pub posted_at: DateTime<Utc>,
}
