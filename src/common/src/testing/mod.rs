//! Test utilities for tweeraser.
//!
//! This module provides reusable test utilities for creating test configurations
//! and an in-memory outcome store.
//!
//! # Feature Flag
//!
//! This module is only available when the `testing` feature is enabled or during tests:
//!
//! ```toml
//! [dev-dependencies]
//! common = { path = "../common", features = ["testing"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use common::testing::{MemoryStore, TestConfigBuilder};
//!
//! let config = TestConfigBuilder::new()
//!     .in_memory()
//!     .with_access_token("token")
//!     .build();
//! let store = MemoryStore::new().with_erased(42, [1, 2, 3]);
//! ```

mod config_builder;
mod memory_store;

pub use config_builder::TestConfigBuilder;
pub use memory_store::MemoryStore;
