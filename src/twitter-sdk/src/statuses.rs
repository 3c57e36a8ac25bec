use crate::types::{TimelineQuery, Tweet, User};
use crate::{SdkError, TwitterClient};

impl TwitterClient {
    /// Destroy a status owned by the authenticated user, returning it
    pub async fn delete_tweet(&self, id: u64, trim_user: bool) -> Result<Tweet, SdkError> {
        self.post(
            &format!("/statuses/destroy/{id}.json"),
            &[("trim_user", trim_user.to_string())],
        )
        .await
    }

    /// One page of the user's timeline, newest first
    pub async fn user_timeline(&self, query: &TimelineQuery) -> Result<Vec<Tweet>, SdkError> {
        self.get("/statuses/user_timeline.json", &query.to_params())
            .await
    }

    /// Account behind the access token
    pub async fn verify_credentials(&self) -> Result<User, SdkError> {
        self.get(
            "/account/verify_credentials.json",
            &[
                ("include_entities", "false".to_string()),
                ("skip_status", "true".to_string()),
                ("include_email", "false".to_string()),
            ],
        )
        .await
    }

    /// Publish a new status
    pub async fn post_tweet(&self, status: &str) -> Result<Tweet, SdkError> {
        self.post("/statuses/update.json", &[("status", status.to_string())])
            .await
    }
}
