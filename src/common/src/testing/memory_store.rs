//! In-memory [`OutcomeStore`] for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::model::{
    EraseError, EraseTweet, NewEraseError, NewEraseTweet, STATUS_NOT_FOUND, TwitterUser,
    TwitterUserRow,
};
use crate::store::{OutcomeStore, StoreError, TransactionalStore, UpsertOutcome};

#[derive(Debug, Default)]
struct State {
    erase_tweets: Vec<EraseTweet>,
    erase_errors: Vec<EraseError>,
    users: HashMap<u64, TwitterUserRow>,
    next_id: u64,
    erased_queries: usize,
    not_found_queries: usize,
    largest_query: usize,
    upserts: usize,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Outcome store kept in process memory, with call counters and failure
/// injection.
///
/// Transactional by default; see [`MemoryStore::without_transactions`].
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    transactional: bool,
    fail_inserts: bool,
    fail_queries: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            transactional: true,
            fail_inserts: false,
            fail_queries: false,
        }
    }

    /// Drop the transactional capability, so owner upserts are unsupported.
    pub fn without_transactions(mut self) -> Self {
        self.transactional = false;
        self
    }

    /// Make every insert fail with a database error.
    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    /// Make every dedup query fail with a database error.
    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    /// Seed success records for `ids` owned by `owner_id`.
    pub fn with_erased(self, owner_id: u64, ids: impl IntoIterator<Item = u64>) -> Self {
        {
            let mut state = self.state();
            let now = Utc::now();
            for twitter_tweet_id in ids {
                let id = state.next_id();
                state.erase_tweets.push(EraseTweet {
                    id,
                    twitter_user_id: Some(owner_id),
                    twitter_tweet_id,
                    tweet: format!("seeded {twitter_tweet_id}"),
                    posted_at: now,
                    updated_at: now,
                    created_at: now,
                });
            }
        }
        self
    }

    /// Seed failure records with `status_code` for `ids` owned by `owner_id`.
    pub fn with_failed(
        self,
        owner_id: u64,
        status_code: u16,
        ids: impl IntoIterator<Item = u64>,
    ) -> Self {
        {
            let mut state = self.state();
            let now = Utc::now();
            for twitter_tweet_id in ids {
                let id = state.next_id();
                state.erase_errors.push(EraseError {
                    id,
                    tried_twitter_user_id: Some(owner_id),
                    twitter_tweet_id,
                    status_code,
                    error_message: format!("seeded failure {status_code}"),
                    updated_at: now,
                    created_at: now,
                });
            }
        }
        self
    }

    /// Seed permanent not-found failures for `ids` owned by `owner_id`.
    pub fn with_not_found(self, owner_id: u64, ids: impl IntoIterator<Item = u64>) -> Self {
        self.with_failed(owner_id, STATUS_NOT_FOUND, ids)
    }

    pub fn with_user(self, user: TwitterUser) -> Self {
        {
            let now = Utc::now();
            self.state().users.insert(
                user.user_id,
                TwitterUserRow {
                    user,
                    updated_at: now,
                    created_at: now,
                },
            );
        }
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn erase_tweets(&self) -> Vec<EraseTweet> {
        self.state().erase_tweets.clone()
    }

    pub fn erase_errors(&self) -> Vec<EraseError> {
        self.state().erase_errors.clone()
    }

    pub fn twitter_user(&self, user_id: u64) -> Option<TwitterUserRow> {
        self.state().users.get(&user_id).cloned()
    }

    /// Number of `already_erased_ids` calls.
    pub fn erased_query_count(&self) -> usize {
        self.state().erased_queries
    }

    /// Number of `not_found_ids` calls.
    pub fn not_found_query_count(&self) -> usize {
        self.state().not_found_queries
    }

    /// Largest id list passed to a single dedup query.
    pub fn largest_query(&self) -> usize {
        self.state().largest_query
    }

    /// Number of owner upserts that reached the store.
    pub fn upsert_count(&self) -> usize {
        self.state().upserts
    }

    fn injected_failure() -> StoreError {
        StoreError::Database(sqlx::Error::PoolClosed)
    }
}

#[async_trait]
impl OutcomeStore for MemoryStore {
    async fn already_erased_ids(&self, owner_id: u64, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let mut state = self.state();
        state.erased_queries += 1;
        state.largest_query = state.largest_query.max(ids.len());
        if self.fail_queries {
            return Err(Self::injected_failure());
        }

        Ok(ids
            .iter()
            .copied()
            .filter(|id| {
                state
                    .erase_tweets
                    .iter()
                    .any(|t| t.twitter_user_id == Some(owner_id) && t.twitter_tweet_id == *id)
            })
            .collect())
    }

    async fn not_found_ids(&self, owner_id: u64, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let mut state = self.state();
        state.not_found_queries += 1;
        state.largest_query = state.largest_query.max(ids.len());
        if self.fail_queries {
            return Err(Self::injected_failure());
        }

        Ok(ids
            .iter()
            .copied()
            .filter(|id| {
                state.erase_errors.iter().any(|e| {
                    e.tried_twitter_user_id == Some(owner_id)
                        && e.twitter_tweet_id == *id
                        && e.is_permanent()
                })
            })
            .collect())
    }

    async fn insert_erase_tweet(&self, record: &NewEraseTweet) -> Result<u64, StoreError> {
        if self.fail_inserts {
            return Err(Self::injected_failure());
        }
        let mut state = self.state();
        let id = state.next_id();
        let now = Utc::now();
        state.erase_tweets.push(EraseTweet {
            id,
            twitter_user_id: record.twitter_user_id,
            twitter_tweet_id: record.twitter_tweet_id,
            tweet: record.tweet.clone(),
            posted_at: record.posted_at,
            updated_at: now,
            created_at: now,
        });
        Ok(id)
    }

    async fn insert_erase_error(&self, record: &NewEraseError) -> Result<u64, StoreError> {
        if self.fail_inserts {
            return Err(Self::injected_failure());
        }
        let mut state = self.state();
        let id = state.next_id();
        let now = Utc::now();
        state.erase_errors.push(EraseError {
            id,
            tried_twitter_user_id: record.tried_twitter_user_id,
            twitter_tweet_id: record.twitter_tweet_id,
            status_code: record.status_code,
            error_message: record.error_message.clone(),
            updated_at: now,
            created_at: now,
        });
        Ok(id)
    }

    fn as_transactional(&self) -> Option<&dyn TransactionalStore> {
        self.transactional.then_some(self as &dyn TransactionalStore)
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    async fn upsert_twitter_user(&self, user: &TwitterUser) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.state();
        state.upserts += 1;
        let now = Utc::now();

        match state.users.get_mut(&user.user_id) {
            None => {
                state.users.insert(
                    user.user_id,
                    TwitterUserRow {
                        user: user.clone(),
                        updated_at: now,
                        created_at: now,
                    },
                );
                Ok(UpsertOutcome::Inserted)
            }
            Some(row) if user.needs_update(&row.user) => {
                row.user = user.clone();
                row.updated_at = now;
                Ok(UpsertOutcome::Updated)
            }
            Some(_) => Ok(UpsertOutcome::Unchanged),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::upsert_twitter_user;

    fn user(name: &str) -> TwitterUser {
        TwitterUser {
            user_id: 7,
            screen_name: "screen_name".into(),
            name: name.into(),
            lang: "en".into(),
        }
    }

    #[tokio::test]
    async fn test_queries_are_scoped_by_owner() {
        let store = MemoryStore::new()
            .with_erased(1, [10, 11])
            .with_erased(2, [12])
            .with_not_found(1, [20])
            .with_failed(1, 500, [21]);

        let erased = store.already_erased_ids(1, &[10, 11, 12, 13]).await.unwrap();
        assert_eq!(erased, vec![10, 11]);

        let not_found = store.not_found_ids(1, &[20, 21, 22]).await.unwrap();
        assert_eq!(not_found, vec![20]);

        assert_eq!(store.erased_query_count(), 1);
        assert_eq!(store.not_found_query_count(), 1);
        assert_eq!(store.largest_query(), 4);
    }

    #[tokio::test]
    async fn test_upsert_lifecycle() {
        let store = MemoryStore::new();

        assert_eq!(
            upsert_twitter_user(&store, &user("name")).await.unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            upsert_twitter_user(&store, &user("name")).await.unwrap(),
            UpsertOutcome::Unchanged
        );
        assert_eq!(
            upsert_twitter_user(&store, &user("name_dup")).await.unwrap(),
            UpsertOutcome::Updated
        );
        assert_eq!(store.twitter_user(7).unwrap().user.name, "name_dup");
        assert_eq!(store.upsert_count(), 3);
    }

    #[tokio::test]
    async fn test_without_transactions() {
        let store = MemoryStore::new().without_transactions();
        let err = upsert_twitter_user(&store, &user("name")).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedOperation(_)));
        assert_eq!(store.upsert_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_inserts() {
        let store = MemoryStore::new().failing_inserts();
        let record = NewEraseError {
            tried_twitter_user_id: Some(1),
            twitter_tweet_id: 1,
            status_code: 500,
            error_message: "boom".into(),
        };
        assert!(store.insert_erase_error(&record).await.is_err());
        assert!(store.erase_errors().is_empty());
    }
}
