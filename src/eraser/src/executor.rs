//! Bounded-concurrency deletion of tweet ids.
//!
//! Ids are processed in trial batches. Every id of a batch gets its own task;
//! the batch ends when all of them have reported, and only then does the next
//! batch start. Each task records its own outcome, so the store sees one
//! single-statement insert per id.

use std::sync::Arc;

use common::store::OutcomeStore;
use futures::future::join_all;

use crate::error::EraserError;
use crate::outcome::{record_failure, record_success};
use crate::remote::TweetApi;

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EraseSummary {
    pub batches: usize,
    pub attempted: usize,
    pub erased: usize,
    pub failed: usize,
}

pub struct EraseExecutor {
    api: Arc<dyn TweetApi>,
    store: Option<Arc<dyn OutcomeStore>>,
    owner_id: u64,
    trial_batch_size: usize,
}

impl EraseExecutor {
    /// Without a store, outcomes are only logged.
    pub fn new(
        api: Arc<dyn TweetApi>,
        store: Option<Arc<dyn OutcomeStore>>,
        owner_id: u64,
        trial_batch_size: usize,
    ) -> Self {
        Self {
            api,
            store,
            owner_id,
            trial_batch_size: trial_batch_size.max(1),
        }
    }

    /// Delete every id, failing with [`EraserError::Incomplete`] if any id
    /// could not be erased or its outcome could not be recorded.
    pub async fn run(&self, ids: &[u64]) -> Result<EraseSummary, EraserError> {
        let mut summary = EraseSummary::default();
        let total_batches = ids.len().div_ceil(self.trial_batch_size);

        for (index, batch) in ids.chunks(self.trial_batch_size).enumerate() {
            log::info!(
                "Erasing batch {}/{total_batches} ({} tweets)",
                index + 1,
                batch.len()
            );

            let handles: Vec<_> = batch
                .iter()
                .map(|&id| {
                    tokio::spawn(erase_one(
                        Arc::clone(&self.api),
                        self.store.clone(),
                        self.owner_id,
                        id,
                    ))
                })
                .collect();

            for result in join_all(handles).await {
                match result {
                    Ok(true) => summary.erased += 1,
                    Ok(false) => summary.failed += 1,
                    Err(e) => {
                        log::error!("Erase task did not complete: {e}");
                        summary.failed += 1;
                    }
                }
            }
            summary.batches += 1;
            summary.attempted += batch.len();
        }

        log::info!(
            "Erased {} of {} tweets in {} batches ({} failed)",
            summary.erased,
            summary.attempted,
            summary.batches,
            summary.failed
        );

        if summary.failed > 0 {
            return Err(EraserError::Incomplete {
                failed: summary.failed,
                attempted: summary.attempted,
            });
        }
        Ok(summary)
    }
}

/// Delete one id and record the outcome. Returns whether the id is erased
/// and recorded.
#[tracing::instrument(name = "erase_tweet", skip(api, store, owner_id))]
async fn erase_one(
    api: Arc<dyn TweetApi>,
    store: Option<Arc<dyn OutcomeStore>>,
    owner_id: u64,
    id: u64,
) -> bool {
    match api.delete_tweet(id, true).await {
        Ok(tweet) => {
            let Some(store) = store else {
                tracing::info!(id, "Erased tweet");
                return true;
            };
            match record_success(store.as_ref(), owner_id, &tweet).await {
                Ok(insert_id) => {
                    tracing::info!(id, insert_id, "Erased tweet");
                    true
                }
                Err(e) => {
                    // The remote delete already happened; the id still counts as failed.
                    tracing::error!(id, error = %e, "Erased tweet but failed to record it");
                    false
                }
            }
        }
        Err(err) => {
            let status_code = err.status_code.unwrap_or(0);
            tracing::error!(id, status_code, error = %err, "Failed to erase tweet");

            if let Some(store) = store {
                match record_failure(store.as_ref(), owner_id, id, &err).await {
                    Ok(insert_id) => tracing::debug!(id, insert_id, "Recorded erase error"),
                    Err(e) => tracing::error!(id, error = %e, "Failed to record erase error"),
                }
            }
            false
        }
    }
}
