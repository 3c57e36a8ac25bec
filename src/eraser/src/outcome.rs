use common::model::{NewEraseError, NewEraseTweet};
use common::store::{OutcomeStore, StoreError};
use thiserror::Error;
use twitter_sdk::Tweet;

use crate::error::RemoteError;

/// Failure to record the outcome of one delete.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid created_at {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Success record for a deleted tweet.
pub fn erase_tweet_record(owner_id: u64, tweet: &Tweet) -> Result<NewEraseTweet, RecordError> {
    let posted_at = tweet
        .created_at_time()
        .map_err(|source| RecordError::Timestamp {
            value: tweet.created_at.clone(),
            source,
        })?;

    Ok(NewEraseTweet {
        twitter_user_id: Some(owner_id),
        twitter_tweet_id: tweet.id,
        tweet: tweet.text.clone(),
        posted_at,
    })
}

/// Failure record for a delete of `tweet_id`; status 0 when none was received.
pub fn erase_error_record(owner_id: u64, tweet_id: u64, err: &RemoteError) -> NewEraseError {
    NewEraseError {
        tried_twitter_user_id: Some(owner_id),
        twitter_tweet_id: tweet_id,
        status_code: err.status_code.unwrap_or(0),
        error_message: err.message.clone(),
    }
}

pub async fn record_success(
    store: &dyn OutcomeStore,
    owner_id: u64,
    tweet: &Tweet,
) -> Result<u64, RecordError> {
    let record = erase_tweet_record(owner_id, tweet)?;
    Ok(store.insert_erase_tweet(&record).await?)
}

pub async fn record_failure(
    store: &dyn OutcomeStore,
    owner_id: u64,
    tweet_id: u64,
    err: &RemoteError,
) -> Result<u64, RecordError> {
    let record = erase_error_record(owner_id, tweet_id, err);
    Ok(store.insert_erase_error(&record).await?)
}
