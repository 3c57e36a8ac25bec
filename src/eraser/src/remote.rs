use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use twitter_sdk::{TimelineQuery, Tweet, TwitterClient, User};

use crate::error::RemoteError;

/// Remote operations the pipeline depends on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TweetApi: Send + Sync {
    /// Delete one tweet, returning the deleted status.
    async fn delete_tweet(&self, id: u64, trim_user: bool) -> Result<Tweet, RemoteError>;

    /// One timeline page; an empty page ends the listing.
    async fn user_timeline(&self, query: &TimelineQuery) -> Result<Vec<Tweet>, RemoteError>;

    /// The account the credentials belong to.
    async fn verify_credentials(&self) -> Result<User, RemoteError>;
}

#[async_trait]
impl TweetApi for TwitterClient {
    async fn delete_tweet(&self, id: u64, trim_user: bool) -> Result<Tweet, RemoteError> {
        Ok(TwitterClient::delete_tweet(self, id, trim_user).await?)
    }

    async fn user_timeline(&self, query: &TimelineQuery) -> Result<Vec<Tweet>, RemoteError> {
        Ok(TwitterClient::user_timeline(self, query).await?)
    }

    async fn verify_credentials(&self) -> Result<User, RemoteError> {
        Ok(TwitterClient::verify_credentials(self).await?)
    }
}
