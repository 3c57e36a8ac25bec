use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use common::config::EraserConfig;
use twitter_sdk::TimelineQuery;

use crate::error::{EraserError, RemoteError, SourceError};
use crate::remote::TweetApi;

/// Header of the id column in an export table.
pub const TWEET_ID_COLUMN: &str = "tweet_id";

/// Member of an export archive holding the table.
pub const ARCHIVE_MEMBER: &str = "tweets.csv";

/// Where candidate ids come from for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSource {
    /// CSV export file
    Table(PathBuf),
    /// Zip export containing [`ARCHIVE_MEMBER`]
    Archive(PathBuf),
    /// Live listing of the user's timeline
    Timeline,
}

impl IdSource {
    /// Pick the source from the CLI paths; a table file wins over an archive.
    pub fn from_paths(csv_file: Option<PathBuf>, zip_file: Option<PathBuf>) -> Self {
        match (csv_file, zip_file) {
            (Some(path), _) => IdSource::Table(path),
            (None, Some(path)) => IdSource::Archive(path),
            (None, None) => IdSource::Timeline,
        }
    }

    /// Whether ids come from a local export rather than live data.
    pub fn is_export(&self) -> bool {
        !matches!(self, IdSource::Timeline)
    }

    /// Load every candidate id for `owner_id`.
    pub async fn load(
        &self,
        api: &dyn TweetApi,
        owner_id: u64,
        config: &EraserConfig,
    ) -> Result<Vec<u64>, EraserError> {
        let ids = match self {
            IdSource::Table(path) => read_table_ids(path)?,
            IdSource::Archive(path) => read_archive_ids(path)?,
            IdSource::Timeline => timeline_ids(api, owner_id, config).await?,
        };
        log::info!("Loaded {} tweet ids from {self}", ids.len());
        Ok(ids)
    }
}

impl fmt::Display for IdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdSource::Table(path) => write!(f, "table {}", path.display()),
            IdSource::Archive(path) => write!(f, "archive {}", path.display()),
            IdSource::Timeline => write!(f, "timeline"),
        }
    }
}

/// Lazy reader of the `tweet_id` column of a CSV table.
///
/// Rows are numbered by line, the header being row 1. The iterator stops
/// after the first error.
pub struct TableIds<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    column: usize,
    row: u64,
    done: bool,
}

impl<R: Read> TableIds<R> {
    /// Read the header and locate the id column.
    pub fn new(reader: R) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| SourceError::MalformedInput {
                row: 1,
                reason: e.to_string(),
            })?;
        let column = headers
            .iter()
            .position(|h| h.trim() == TWEET_ID_COLUMN)
            .ok_or_else(|| SourceError::MalformedInput {
                row: 1,
                reason: format!("missing {TWEET_ID_COLUMN} column"),
            })?;

        Ok(Self {
            records: reader.into_records(),
            column,
            row: 1,
            done: false,
        })
    }

    fn malformed(&mut self, reason: String) -> Option<Result<u64, SourceError>> {
        self.done = true;
        Some(Err(SourceError::MalformedInput {
            row: self.row,
            reason,
        }))
    }
}

impl<R: Read> Iterator for TableIds<R> {
    type Item = Result<u64, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let record = self.records.next()?;
        self.row += 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => return self.malformed(e.to_string()),
        };
        if let Some(line) = record.position().map(|p| p.line()) {
            self.row = line;
        }

        let Some(field) = record.get(self.column) else {
            return self.malformed(format!("missing {TWEET_ID_COLUMN} field"));
        };
        match field.trim().parse::<u64>() {
            Ok(id) => Some(Ok(id)),
            Err(e) => self.malformed(format!("invalid {TWEET_ID_COLUMN} {field:?}: {e}")),
        }
    }
}

/// All ids of a CSV export file.
pub fn read_table_ids(path: &Path) -> Result<Vec<u64>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    TableIds::new(file)?.collect()
}

/// All ids of the table inside a zip export.
pub fn read_archive_ids(path: &Path) -> Result<Vec<u64>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| SourceError::Archive {
        path: path.to_path_buf(),
        source,
    })?;

    let member = match archive.by_name(ARCHIVE_MEMBER) {
        Ok(member) => member,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(SourceError::MemberNotFound(ARCHIVE_MEMBER.to_string()));
        }
        Err(source) => {
            return Err(SourceError::Archive {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    TableIds::new(member)?.collect()
}

/// Page through the user's timeline until an empty page.
pub async fn timeline_ids(
    api: &dyn TweetApi,
    user_id: u64,
    config: &EraserConfig,
) -> Result<Vec<u64>, RemoteError> {
    let mut query = TimelineQuery {
        count: config.timeline_page_size,
        exclude_replies: config.exclude_replies,
        include_rts: config.include_retweets,
        ..TimelineQuery::new(user_id)
    };
    let mut ids = Vec::new();

    loop {
        let page = api.user_timeline(&query).await?;
        let Some(last) = page.last().map(|t| t.id) else {
            break;
        };
        log::debug!("Timeline page of {} tweets, last id {last}", page.len());
        ids.extend(page.iter().map(|t| t.id));

        // Id 0 is the smallest possible; nothing can follow it.
        let Some(max_id) = last.checked_sub(1) else {
            break;
        };
        query.max_id = Some(max_id);
    }

    Ok(ids)
}
