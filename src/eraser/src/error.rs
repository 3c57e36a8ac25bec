use std::path::PathBuf;

use common::store::StoreError;
use thiserror::Error;
use twitter_sdk::SdkError;

/// Failure of a remote API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    /// HTTP status, when the call got that far
    pub status_code: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }
}

impl From<SdkError> for RemoteError {
    fn from(err: SdkError) -> Self {
        Self {
            status_code: err.status(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("malformed input at row {row}: {reason}")]
    MalformedInput { row: u64, reason: String },
    #[error("archive member not found: {0}")]
    MemberNotFound(String),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

#[derive(Debug, Error)]
pub enum EraserError {
    #[error("failed to load tweet ids: {0}")]
    Source(#[from] SourceError),
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("outcome store error: {0}")]
    Store(#[from] StoreError),
    /// At least one id could not be erased; details are in the logs.
    #[error("failed to erase {failed} of {attempted} tweets")]
    Incomplete { failed: usize, attempted: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_from_sdk_error() {
        let err = RemoteError::from(SdkError::Api {
            status: 404,
            message: "No status found with that ID.".into(),
        });
        assert_eq!(err.status_code, Some(404));
        assert!(err.message.contains("No status found"));
        assert_eq!(err.to_string(), "API error (404): No status found with that ID.");
    }

    #[test]
    fn test_incomplete_never_names_ids() {
        let err = EraserError::Incomplete {
            failed: 2,
            attempted: 1500,
        };
        assert_eq!(err.to_string(), "failed to erase 2 of 1500 tweets");
    }
}
