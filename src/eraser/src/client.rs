use std::sync::Arc;

use common::config::{Configuration, EraserConfig};
use common::model::TwitterUser;
use common::store::{OutcomeStore, SqlStore, StoreError, upsert_twitter_user};
use twitter_sdk::TwitterClient;

use crate::dedup::DedupFilter;
use crate::error::{EraserError, RemoteError};
use crate::executor::{EraseExecutor, EraseSummary};
use crate::remote::TweetApi;
use crate::source::IdSource;

/// Runs one erasure: resolve the owner, load ids, dedup, delete.
pub struct ErasureClient {
    api: Arc<dyn TweetApi>,
    store: Option<Arc<dyn OutcomeStore>>,
    config: EraserConfig,
}

impl ErasureClient {
    pub fn new(
        api: Arc<dyn TweetApi>,
        store: Option<Arc<dyn OutcomeStore>>,
        config: EraserConfig,
    ) -> Self {
        Self { api, store, config }
    }

    /// Build the API client and connect the outcome store from `config`.
    ///
    /// An unreachable store is not fatal: the client then erases without
    /// recording outcomes.
    pub async fn connect(config: &Configuration) -> Result<Self, EraserError> {
        let api = TwitterClient::new(
            &config.api.base_url,
            &config.api.access_token,
            config.api.timeout,
        )
        .map_err(RemoteError::from)?;

        let store: Option<Arc<dyn OutcomeStore>> = match config.database() {
            None => {
                log::info!("Outcome recording disabled");
                None
            }
            Some(database) => match SqlStore::connect(database).await {
                Ok(store) => Some(Arc::new(store) as Arc<dyn OutcomeStore>),
                Err(StoreError::Unavailable(e)) => {
                    log::warn!("Outcome store unavailable, erasing without recording: {e}");
                    None
                }
                Err(e) => return Err(e.into()),
            },
        };

        Ok(Self::new(Arc::new(api), store, config.eraser.clone()))
    }

    /// Whether outcomes are written to a store.
    pub fn records_outcomes(&self) -> bool {
        self.store.is_some()
    }

    /// The account the credentials belong to.
    pub async fn owner(&self) -> Result<TwitterUser, EraserError> {
        let user = self.api.verify_credentials().await?;
        Ok(TwitterUser {
            user_id: user.id,
            screen_name: user.screen_name,
            name: user.name,
            lang: user.lang.unwrap_or_default(),
        })
    }

    /// Erase every id of `source`. Export ids already resolved in the store
    /// are skipped unless `check` is false.
    pub async fn run(&self, source: &IdSource, check: bool) -> Result<EraseSummary, EraserError> {
        let owner = self.owner().await?;
        log::info!("Erasing tweets of @{} ({})", owner.screen_name, owner.user_id);

        if let Some(store) = &self.store {
            let outcome = upsert_twitter_user(store.as_ref(), &owner).await?;
            log::debug!("Owner upsert: {outcome:?}");
        }

        let mut ids = source.load(self.api.as_ref(), owner.user_id, &self.config).await?;

        if source.is_export() {
            match (&self.store, check) {
                (_, false) => log::info!("Skipping dedup check"),
                (None, true) => log::warn!("No outcome store available, skipping dedup check"),
                (Some(store), true) => {
                    ids = DedupFilter::new(store.as_ref(), self.config.dedup_chunk_size)
                        .retain_pending(owner.user_id, &ids)
                        .await?;
                }
            }
        }

        EraseExecutor::new(
            Arc::clone(&self.api),
            self.store.clone(),
            owner.user_id,
            self.config.trial_batch_size,
        )
        .run(&ids)
        .await
    }
}
