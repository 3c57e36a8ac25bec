//! Persistence of erasure outcomes.
//!
//! Two capabilities are exposed. [`OutcomeStore`] covers the single-statement
//! reads and inserts issued concurrently by the erasure workers.
//! [`TransactionalStore`] covers the owner upsert, which needs a
//! select-for-update and a write committed as one unit. Stores that cannot run
//! transactions only implement the former; [`upsert_twitter_user`] then fails
//! with [`StoreError::UnsupportedOperation`].

mod sql;

pub use sql::{SqlStore, ensure_data_directory};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{NewEraseError, NewEraseTweet, TwitterUser};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("outcome store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid stored value: {0}")]
    Decode(String),
    #[error("store does not support {0}")]
    UnsupportedOperation(&'static str),
    #[error("row not found: {0}")]
    RowNotFound(u64),
}

/// What an owner upsert ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Read/write access to prior erasure outcomes, scoped by owner.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Subset of `ids` already erased on behalf of `owner_id`.
    async fn already_erased_ids(&self, owner_id: u64, ids: &[u64]) -> Result<Vec<u64>, StoreError>;

    /// Subset of `ids` whose delete failed permanently (not found) for `owner_id`.
    async fn not_found_ids(&self, owner_id: u64, ids: &[u64]) -> Result<Vec<u64>, StoreError>;

    /// Record a successful delete, returning the new row id.
    async fn insert_erase_tweet(&self, record: &NewEraseTweet) -> Result<u64, StoreError>;

    /// Record a failed delete, returning the new row id.
    async fn insert_erase_error(&self, record: &NewEraseError) -> Result<u64, StoreError>;

    /// Transactional capability of this store, if any.
    fn as_transactional(&self) -> Option<&dyn TransactionalStore> {
        None
    }
}

/// Operations that must run inside a single transaction.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Insert the user if absent, update it if its display fields changed,
    /// otherwise leave it untouched.
    async fn upsert_twitter_user(&self, user: &TwitterUser) -> Result<UpsertOutcome, StoreError>;
}

/// Upsert `user` through `store`, failing fast when it is not transactional.
pub async fn upsert_twitter_user(
    store: &dyn OutcomeStore,
    user: &TwitterUser,
) -> Result<UpsertOutcome, StoreError> {
    let transactional = store
        .as_transactional()
        .ok_or(StoreError::UnsupportedOperation("upsert_twitter_user"))?;
    transactional.upsert_twitter_user(user).await
}
