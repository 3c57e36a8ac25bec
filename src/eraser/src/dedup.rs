use std::collections::HashSet;

use common::config::MAX_DEDUP_CHUNK_SIZE;
use common::store::{OutcomeStore, StoreError};

/// Drops ids whose erasure is already resolved for an owner: erased before,
/// or permanently not found.
pub struct DedupFilter<'a> {
    store: &'a dyn OutcomeStore,
    chunk_size: usize,
}

impl<'a> DedupFilter<'a> {
    pub fn new(store: &'a dyn OutcomeStore, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.clamp(1, MAX_DEDUP_CHUNK_SIZE),
        }
    }

    /// Ids of `ids` still needing a remote delete, each once, in first
    /// occurrence order. Any failing query aborts the whole filter.
    pub async fn retain_pending(&self, owner_id: u64, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut resolved = HashSet::new();
        for chunk in unique.chunks(self.chunk_size) {
            resolved.extend(self.store.already_erased_ids(owner_id, chunk).await?);
            resolved.extend(self.store.not_found_ids(owner_id, chunk).await?);
        }

        let pending: Vec<u64> = unique
            .into_iter()
            .filter(|id| !resolved.contains(id))
            .collect();

        log::info!(
            "Dedup kept {} of {} tweet ids ({} already resolved)",
            pending.len(),
            ids.len(),
            resolved.len()
        );
        Ok(pending)
    }
}
