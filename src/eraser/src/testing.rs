//! In-process fake of the remote API.
//!
//! Available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! eraser = { path = "../eraser", features = ["testing"] }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use twitter_sdk::{TimelineQuery, Tweet, User, UserRef};

use crate::error::RemoteError;
use crate::remote::TweetApi;

/// Delete lifecycle events, in the order the fake observed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiEvent {
    Started(u64),
    Finished(u64),
}

/// Fake [`TweetApi`] recording every call.
///
/// Deletes succeed unless a failure was injected for the id. Each delete
/// yields to the scheduler once between start and finish, so concurrent
/// deletes overlap.
#[derive(Debug)]
pub struct FakeTweetApi {
    user: User,
    created_at: String,
    timeline: Vec<u64>,
    failures: HashMap<u64, RemoteError>,
    timeline_failure: Option<RemoteError>,
    credentials_failure: Option<RemoteError>,
    deletes: Mutex<Vec<(u64, bool)>>,
    events: Mutex<Vec<ApiEvent>>,
    timeline_queries: Mutex<Vec<TimelineQuery>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for FakeTweetApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTweetApi {
    pub fn new() -> Self {
        Self {
            user: User {
                id: 42,
                name: "name".into(),
                screen_name: "screen_name".into(),
                lang: Some("en".into()),
            },
            created_at: "Wed Aug 27 13:08:45 +0000 2008".into(),
            timeline: Vec::new(),
            failures: HashMap::new(),
            timeline_failure: None,
            credentials_failure: None,
            deletes: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            timeline_queries: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Account returned by `verify_credentials`.
    pub fn with_user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    /// `created_at` of every deleted tweet.
    pub fn with_created_at(mut self, created_at: &str) -> Self {
        self.created_at = created_at.to_string();
        self
    }

    /// Tweets listed by the timeline, served newest (largest id) first.
    pub fn with_timeline(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.timeline = ids.into_iter().collect();
        self.timeline.sort_unstable_by(|a, b| b.cmp(a));
        self
    }

    /// Fail the delete of `id` with `err`.
    pub fn failing(mut self, id: u64, err: RemoteError) -> Self {
        self.failures.insert(id, err);
        self
    }

    pub fn failing_timeline(mut self, err: RemoteError) -> Self {
        self.timeline_failure = Some(err);
        self
    }

    pub fn failing_credentials(mut self, err: RemoteError) -> Self {
        self.credentials_failure = Some(err);
        self
    }

    /// Every delete as `(id, trim_user)`, in call order.
    pub fn deletes(&self) -> Vec<(u64, bool)> {
        lock(&self.deletes).clone()
    }

    pub fn delete_count(&self) -> usize {
        lock(&self.deletes).len()
    }

    pub fn events(&self) -> Vec<ApiEvent> {
        lock(&self.events).clone()
    }

    pub fn timeline_queries(&self) -> Vec<TimelineQuery> {
        lock(&self.timeline_queries).clone()
    }

    /// Highest number of deletes observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn tweet(&self, id: u64) -> Tweet {
        Tweet {
            id,
            text: format!("tweet {id}"),
            created_at: self.created_at.clone(),
            user: Some(UserRef { id: self.user.id }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl TweetApi for FakeTweetApi {
    async fn delete_tweet(&self, id: u64, trim_user: bool) -> Result<Tweet, RemoteError> {
        lock(&self.deletes).push((id, trim_user));
        lock(&self.events).push(ApiEvent::Started(id));
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        lock(&self.events).push(ApiEvent::Finished(id));

        match self.failures.get(&id) {
            Some(err) => Err(err.clone()),
            None => Ok(self.tweet(id)),
        }
    }

    async fn user_timeline(&self, query: &TimelineQuery) -> Result<Vec<Tweet>, RemoteError> {
        lock(&self.timeline_queries).push(query.clone());
        if let Some(err) = &self.timeline_failure {
            return Err(err.clone());
        }

        let max_id = query.max_id.unwrap_or(u64::MAX);
        Ok(self
            .timeline
            .iter()
            .copied()
            .filter(|id| *id <= max_id)
            .take(query.count as usize)
            .map(|id| self.tweet(id))
            .collect())
    }

    async fn verify_credentials(&self) -> Result<User, RemoteError> {
        match &self.credentials_failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.user.clone()),
        }
    }
}
