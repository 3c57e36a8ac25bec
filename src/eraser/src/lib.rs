//! Bulk erasure of a user's tweets.
//!
//! Candidate ids come from an export ([`source::IdSource::Table`],
//! [`source::IdSource::Archive`]) or from paging the remote timeline. Export ids
//! are filtered against earlier outcomes by [`dedup::DedupFilter`], then
//! [`executor::EraseExecutor`] deletes them in bounded concurrent batches and
//! records every outcome. [`client::ErasureClient`] wires the steps together.

pub mod client;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod remote;
pub mod source;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::ErasureClient;
pub use error::{EraserError, RemoteError, SourceError};
pub use executor::{EraseExecutor, EraseSummary};
pub use remote::TweetApi;
pub use source::IdSource;
