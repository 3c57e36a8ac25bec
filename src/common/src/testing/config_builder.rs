//! Test configuration builder for creating test setups quickly.

use std::time::Duration;

use crate::config::{Configuration, DatabaseConfig};

/// Builder for creating test configurations.
///
/// # Example
///
/// ```rust,ignore
/// use common::testing::TestConfigBuilder;
///
/// let config = TestConfigBuilder::new()
///     .in_memory()
///     .with_base_url("http://127.0.0.1:8080")
///     .with_trial_batch_size(10)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    config: Configuration,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    /// Create a builder with a dummy access token and a short API timeout.
    pub fn new() -> Self {
        let mut config = Configuration::default();
        config.api.access_token = "test-token".to_string();
        config.api.timeout = Duration::from_secs(5);
        Self { config }
    }

    /// Record outcomes into a private in-memory SQLite database.
    pub fn in_memory(mut self) -> Self {
        self.config.database = DatabaseConfig::in_memory();
        self
    }

    /// Disable outcome recording.
    pub fn without_database(mut self) -> Self {
        self.config.database.enabled = false;
        self
    }

    pub fn with_database_dsn(mut self, dsn: &str) -> Self {
        self.config.database.enabled = true;
        self.config.database.dsn = dsn.to_string();
        self
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.config.api.access_token = token.to_string();
        self
    }

    /// Point the API client at a fake server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.api.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_trial_batch_size(mut self, size: usize) -> Self {
        self.config.eraser.trial_batch_size = size;
        self
    }

    pub fn with_dedup_chunk_size(mut self, size: usize) -> Self {
        self.config.eraser.dedup_chunk_size = size;
        self
    }

    pub fn with_timeline_page_size(mut self, size: u32) -> Self {
        self.config.eraser.timeline_page_size = size;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> Configuration {
        self.config
    }
}
