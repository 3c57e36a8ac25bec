use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, QueryBuilder, Row, Sqlite, SqlitePool, query};

use super::{OutcomeStore, StoreError, TransactionalStore, UpsertOutcome};
use crate::config::{DatabaseConfig, redact_dsn};
use crate::model::{
    ERASE_ERROR_TABLE_NAME, ERASE_TWEET_TABLE_NAME, EraseError, EraseTweet, NewEraseError,
    NewEraseTweet, STATUS_NOT_FOUND, TwitterUser, TwitterUserRow, from_db_id, to_db_id,
};

/// SQL-backed outcome store (PostgreSQL or SQLite).
#[derive(Clone, Debug)]
pub enum SqlStore {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl SqlStore {
    /// Connect using the database section of the configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::new(&config.dsn, config.max_connections).await
    }

    /// Connect to `dsn`, verify the connection and initialize the schema.
    pub async fn new(dsn: &str, max_connections: u32) -> Result<Self, StoreError> {
        let masked = redact_dsn(dsn);
        log::info!("Connecting to outcome store with DSN: {masked}");

        let store = if dsn.starts_with("sqlite:") {
            ensure_data_directory(dsn).map_err(|e| StoreError::Unavailable(sqlx::Error::Io(e)))?;

            let options = SqliteConnectOptions::from_str(dsn)
                .map_err(StoreError::Unavailable)?
                .create_if_missing(true)
                .busy_timeout(Duration::from_secs(5));

            // SQLite allows a single writer
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
                .map_err(|e| {
                    log::error!("Failed to connect to SQLite database with DSN '{masked}': {e}");
                    StoreError::Unavailable(e)
                })?;
            SqlStore::Sqlite(pool)
        } else {
            let pool = PgPoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect(dsn)
                .await
                .map_err(|e| {
                    log::error!("Failed to connect to PostgreSQL database with DSN '{masked}': {e}");
                    StoreError::Unavailable(e)
                })?;
            SqlStore::Postgres(pool)
        };

        store.ping().await.map_err(StoreError::Unavailable)?;
        log::info!("Database connection established successfully");

        store.init().await?;
        log::info!("Outcome store schema initialized successfully");
        Ok(store)
    }

    /// Private in-memory SQLite store.
    pub async fn new_in_memory() -> Result<Self, StoreError> {
        Self::new("sqlite::memory:", 1).await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        match self {
            SqlStore::Sqlite(pool) => {
                query("SELECT 1").execute(pool).await?;
            }
            SqlStore::Postgres(pool) => {
                query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Create tables if they do not exist.
    async fn init(&self) -> Result<(), StoreError> {
        match self {
            SqlStore::Sqlite(pool) => {
                let statements = [
                    r#"
                    CREATE TABLE IF NOT EXISTS erase_tweets (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        twitter_user_id INTEGER,
                        twitter_tweet_id INTEGER NOT NULL,
                        tweet TEXT NOT NULL,
                        posted_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    )"#,
                    r#"
                    CREATE INDEX IF NOT EXISTS erase_tweets_user_tweet
                    ON erase_tweets (twitter_user_id, twitter_tweet_id)"#,
                    r#"
                    CREATE TABLE IF NOT EXISTS erase_errors (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        tried_twitter_user_id INTEGER,
                        twitter_tweet_id INTEGER NOT NULL,
                        status_code INTEGER NOT NULL,
                        error_message TEXT NOT NULL,
                        updated_at TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    )"#,
                    r#"
                    CREATE INDEX IF NOT EXISTS erase_errors_user_status_tweet
                    ON erase_errors (tried_twitter_user_id, status_code, twitter_tweet_id)"#,
                    r#"
                    CREATE TABLE IF NOT EXISTS twitter_users (
                        user_id INTEGER PRIMARY KEY,
                        screen_name TEXT NOT NULL,
                        name TEXT NOT NULL,
                        lang TEXT NOT NULL,
                        updated_at TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    )"#,
                ];
                for statement in statements {
                    query(statement).execute(pool).await?;
                }
            }
            SqlStore::Postgres(pool) => {
                let statements = [
                    r#"
                    CREATE TABLE IF NOT EXISTS erase_tweets (
                        id BIGSERIAL PRIMARY KEY,
                        twitter_user_id BIGINT,
                        twitter_tweet_id BIGINT NOT NULL,
                        tweet TEXT NOT NULL,
                        posted_at TIMESTAMPTZ NOT NULL,
                        updated_at TIMESTAMPTZ NOT NULL,
                        created_at TIMESTAMPTZ NOT NULL
                    )"#,
                    r#"
                    CREATE INDEX IF NOT EXISTS erase_tweets_user_tweet
                    ON erase_tweets (twitter_user_id, twitter_tweet_id)"#,
                    r#"
                    CREATE TABLE IF NOT EXISTS erase_errors (
                        id BIGSERIAL PRIMARY KEY,
                        tried_twitter_user_id BIGINT,
                        twitter_tweet_id BIGINT NOT NULL,
                        status_code INT NOT NULL,
                        error_message TEXT NOT NULL,
                        updated_at TIMESTAMPTZ NOT NULL,
                        created_at TIMESTAMPTZ NOT NULL
                    )"#,
                    r#"
                    CREATE INDEX IF NOT EXISTS erase_errors_user_status_tweet
                    ON erase_errors (tried_twitter_user_id, status_code, twitter_tweet_id)"#,
                    r#"
                    CREATE TABLE IF NOT EXISTS twitter_users (
                        user_id BIGINT PRIMARY KEY,
                        screen_name TEXT NOT NULL,
                        name TEXT NOT NULL,
                        lang TEXT NOT NULL,
                        updated_at TIMESTAMPTZ NOT NULL,
                        created_at TIMESTAMPTZ NOT NULL
                    )"#,
                ];
                for statement in statements {
                    query(statement).execute(pool).await?;
                }
            }
        }

        Ok(())
    }

    /// Tweet ids in `ids` matching a row of `table` owned by `owner_id`.
    /// `filter` is an extra SQL condition on the same table.
    async fn matching_tweet_ids(
        &self,
        table: &str,
        owner_column: &str,
        filter: Option<&str>,
        owner_id: u64,
        ids: &[u64],
    ) -> Result<Vec<u64>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = filter.map(|f| format!(" AND {f}")).unwrap_or_default();

        match self {
            SqlStore::Sqlite(pool) => {
                let mut builder = QueryBuilder::<Sqlite>::new(format!(
                    "SELECT DISTINCT twitter_tweet_id FROM {table} WHERE {owner_column} = "
                ));
                builder.push_bind(to_db_id(owner_id));
                builder.push(filter);
                builder.push(" AND twitter_tweet_id IN (");
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(to_db_id(*id));
                }
                separated.push_unseparated(")");

                let rows = builder.build().fetch_all(pool).await?;
                rows.iter()
                    .map(|row| -> Result<u64, StoreError> {
                        Ok(from_db_id(row.try_get("twitter_tweet_id")?))
                    })
                    .collect()
            }
            SqlStore::Postgres(pool) => {
                let stmt = format!(
                    "SELECT DISTINCT twitter_tweet_id FROM {table} \
                     WHERE {owner_column} = $1{filter} AND twitter_tweet_id = ANY($2)"
                );
                let db_ids: Vec<i64> = ids.iter().copied().map(to_db_id).collect();
                let rows = query(&stmt)
                    .bind(to_db_id(owner_id))
                    .bind(db_ids)
                    .fetch_all(pool)
                    .await?;
                rows.iter()
                    .map(|row| -> Result<u64, StoreError> {
                        Ok(from_db_id(row.try_get("twitter_tweet_id")?))
                    })
                    .collect()
            }
        }
    }

    /// All erased tweets recorded for `owner_id`, oldest record first.
    pub async fn erase_tweets(&self, owner_id: u64) -> Result<Vec<EraseTweet>, StoreError> {
        let sql_sqlite = "SELECT id, twitter_user_id, twitter_tweet_id, tweet, posted_at, updated_at, created_at \
                          FROM erase_tweets WHERE twitter_user_id = ? ORDER BY id";
        let sql_pg = "SELECT id, twitter_user_id, twitter_tweet_id, tweet, posted_at, updated_at, created_at \
                      FROM erase_tweets WHERE twitter_user_id = $1 ORDER BY id";
        match self {
            SqlStore::Sqlite(pool) => {
                let rows = query(sql_sqlite)
                    .bind(to_db_id(owner_id))
                    .fetch_all(pool)
                    .await?;
                let mut tweets = Vec::with_capacity(rows.len());
                for row in rows {
                    tweets.push(EraseTweet {
                        id: from_db_id(row.try_get("id")?),
                        twitter_user_id: row
                            .try_get::<Option<i64>, _>("twitter_user_id")?
                            .map(from_db_id),
                        twitter_tweet_id: from_db_id(row.try_get("twitter_tweet_id")?),
                        tweet: row.try_get("tweet")?,
                        posted_at: parse_timestamp(row.try_get("posted_at")?)?,
                        updated_at: parse_timestamp(row.try_get("updated_at")?)?,
                        created_at: parse_timestamp(row.try_get("created_at")?)?,
                    });
                }
                Ok(tweets)
            }
            SqlStore::Postgres(pool) => {
                let rows = query(sql_pg)
                    .bind(to_db_id(owner_id))
                    .fetch_all(pool)
                    .await?;
                let mut tweets = Vec::with_capacity(rows.len());
                for row in rows {
                    tweets.push(EraseTweet {
                        id: from_db_id(row.try_get("id")?),
                        twitter_user_id: row
                            .try_get::<Option<i64>, _>("twitter_user_id")?
                            .map(from_db_id),
                        twitter_tweet_id: from_db_id(row.try_get("twitter_tweet_id")?),
                        tweet: row.try_get("tweet")?,
                        posted_at: row.try_get("posted_at")?,
                        updated_at: row.try_get("updated_at")?,
                        created_at: row.try_get("created_at")?,
                    });
                }
                Ok(tweets)
            }
        }
    }

    /// All failed deletes recorded for `owner_id`, oldest record first.
    pub async fn erase_errors(&self, owner_id: u64) -> Result<Vec<EraseError>, StoreError> {
        let sql_sqlite = "SELECT id, tried_twitter_user_id, twitter_tweet_id, status_code, error_message, updated_at, created_at \
                          FROM erase_errors WHERE tried_twitter_user_id = ? ORDER BY id";
        let sql_pg = "SELECT id, tried_twitter_user_id, twitter_tweet_id, status_code, error_message, updated_at, created_at \
                      FROM erase_errors WHERE tried_twitter_user_id = $1 ORDER BY id";
        match self {
            SqlStore::Sqlite(pool) => {
                let rows = query(sql_sqlite)
                    .bind(to_db_id(owner_id))
                    .fetch_all(pool)
                    .await?;
                let mut errors = Vec::with_capacity(rows.len());
                for row in rows {
                    let status_code: i64 = row.try_get("status_code")?;
                    errors.push(EraseError {
                        id: from_db_id(row.try_get("id")?),
                        tried_twitter_user_id: row
                            .try_get::<Option<i64>, _>("tried_twitter_user_id")?
                            .map(from_db_id),
                        twitter_tweet_id: from_db_id(row.try_get("twitter_tweet_id")?),
                        status_code: decode_status(status_code)?,
                        error_message: row.try_get("error_message")?,
                        updated_at: parse_timestamp(row.try_get("updated_at")?)?,
                        created_at: parse_timestamp(row.try_get("created_at")?)?,
                    });
                }
                Ok(errors)
            }
            SqlStore::Postgres(pool) => {
                let rows = query(sql_pg)
                    .bind(to_db_id(owner_id))
                    .fetch_all(pool)
                    .await?;
                let mut errors = Vec::with_capacity(rows.len());
                for row in rows {
                    let status_code: i32 = row.try_get("status_code")?;
                    errors.push(EraseError {
                        id: from_db_id(row.try_get("id")?),
                        tried_twitter_user_id: row
                            .try_get::<Option<i64>, _>("tried_twitter_user_id")?
                            .map(from_db_id),
                        twitter_tweet_id: from_db_id(row.try_get("twitter_tweet_id")?),
                        status_code: decode_status(i64::from(status_code))?,
                        error_message: row.try_get("error_message")?,
                        updated_at: row.try_get("updated_at")?,
                        created_at: row.try_get("created_at")?,
                    });
                }
                Ok(errors)
            }
        }
    }

    /// Stored profile of `user_id`, if any.
    pub async fn twitter_user(&self, user_id: u64) -> Result<Option<TwitterUserRow>, StoreError> {
        match self {
            SqlStore::Sqlite(pool) => {
                let row = query(
                    "SELECT user_id, screen_name, name, lang, updated_at, created_at \
                     FROM twitter_users WHERE user_id = ?",
                )
                .bind(to_db_id(user_id))
                .fetch_optional(pool)
                .await?;
                row.map(|row| -> Result<TwitterUserRow, StoreError> {
                    Ok(TwitterUserRow {
                        user: user_from_row(&row)?,
                        updated_at: parse_timestamp(row.try_get("updated_at")?)?,
                        created_at: parse_timestamp(row.try_get("created_at")?)?,
                    })
                })
                .transpose()
            }
            SqlStore::Postgres(pool) => {
                let row = query(
                    "SELECT user_id, screen_name, name, lang, updated_at, created_at \
                     FROM twitter_users WHERE user_id = $1",
                )
                .bind(to_db_id(user_id))
                .fetch_optional(pool)
                .await?;
                row.map(|row| -> Result<TwitterUserRow, StoreError> {
                    Ok(TwitterUserRow {
                        user: user_from_row(&row)?,
                        updated_at: row.try_get("updated_at")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .transpose()
            }
        }
    }
}

#[async_trait]
impl OutcomeStore for SqlStore {
    async fn already_erased_ids(&self, owner_id: u64, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        self.matching_tweet_ids(ERASE_TWEET_TABLE_NAME, "twitter_user_id", None, owner_id, ids)
            .await
    }

    async fn not_found_ids(&self, owner_id: u64, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        let filter = format!("status_code = {STATUS_NOT_FOUND}");
        self.matching_tweet_ids(
            ERASE_ERROR_TABLE_NAME,
            "tried_twitter_user_id",
            Some(&filter),
            owner_id,
            ids,
        )
        .await
    }

    async fn insert_erase_tweet(&self, record: &NewEraseTweet) -> Result<u64, StoreError> {
        let now = Utc::now();
        match self {
            SqlStore::Sqlite(pool) => {
                let stmt = r#"
                INSERT INTO erase_tweets
                    (twitter_user_id, twitter_tweet_id, tweet, posted_at, updated_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#;
                let result = query(stmt)
                    .bind(record.twitter_user_id.map(to_db_id))
                    .bind(to_db_id(record.twitter_tweet_id))
                    .bind(&record.tweet)
                    .bind(record.posted_at.to_rfc3339())
                    .bind(now.to_rfc3339())
                    .bind(now.to_rfc3339())
                    .execute(pool)
                    .await?;
                Ok(from_db_id(result.last_insert_rowid()))
            }
            SqlStore::Postgres(pool) => {
                let stmt = r#"
                INSERT INTO erase_tweets
                    (twitter_user_id, twitter_tweet_id, tweet, posted_at, updated_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                RETURNING id
                "#;
                let row = query(stmt)
                    .bind(record.twitter_user_id.map(to_db_id))
                    .bind(to_db_id(record.twitter_tweet_id))
                    .bind(&record.tweet)
                    .bind(record.posted_at)
                    .bind(now)
                    .fetch_one(pool)
                    .await?;
                Ok(from_db_id(row.try_get("id")?))
            }
        }
    }

    async fn insert_erase_error(&self, record: &NewEraseError) -> Result<u64, StoreError> {
        let now = Utc::now();
        match self {
            SqlStore::Sqlite(pool) => {
                let stmt = r#"
                INSERT INTO erase_errors
                    (tried_twitter_user_id, twitter_tweet_id, status_code, error_message, updated_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#;
                let result = query(stmt)
                    .bind(record.tried_twitter_user_id.map(to_db_id))
                    .bind(to_db_id(record.twitter_tweet_id))
                    .bind(i64::from(record.status_code))
                    .bind(&record.error_message)
                    .bind(now.to_rfc3339())
                    .bind(now.to_rfc3339())
                    .execute(pool)
                    .await?;
                Ok(from_db_id(result.last_insert_rowid()))
            }
            SqlStore::Postgres(pool) => {
                let stmt = r#"
                INSERT INTO erase_errors
                    (tried_twitter_user_id, twitter_tweet_id, status_code, error_message, updated_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                RETURNING id
                "#;
                let row = query(stmt)
                    .bind(record.tried_twitter_user_id.map(to_db_id))
                    .bind(to_db_id(record.twitter_tweet_id))
                    .bind(i32::from(record.status_code))
                    .bind(&record.error_message)
                    .bind(now)
                    .fetch_one(pool)
                    .await?;
                Ok(from_db_id(row.try_get("id")?))
            }
        }
    }

    fn as_transactional(&self) -> Option<&dyn TransactionalStore> {
        Some(self)
    }
}

#[async_trait]
impl TransactionalStore for SqlStore {
    async fn upsert_twitter_user(&self, user: &TwitterUser) -> Result<UpsertOutcome, StoreError> {
        let user_id = to_db_id(user.user_id);

        // The transaction rolls back when dropped on an early return.
        match self {
            SqlStore::Sqlite(pool) => {
                let now = Utc::now().to_rfc3339();
                let mut tx = pool.begin().await?;

                // No row locks in SQLite; ON CONFLICT covers a concurrent insert.
                let existing = query(
                    "SELECT user_id, screen_name, name, lang FROM twitter_users WHERE user_id = ?",
                )
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

                let outcome = match existing {
                    None => {
                        query(
                            r#"
                            INSERT INTO twitter_users (user_id, screen_name, name, lang, updated_at, created_at)
                            VALUES (?, ?, ?, ?, ?, ?)
                            ON CONFLICT (user_id) DO UPDATE SET
                                screen_name = excluded.screen_name,
                                name = excluded.name,
                                lang = excluded.lang,
                                updated_at = excluded.updated_at
                            "#,
                        )
                        .bind(user_id)
                        .bind(&user.screen_name)
                        .bind(&user.name)
                        .bind(&user.lang)
                        .bind(&now)
                        .bind(&now)
                        .execute(&mut *tx)
                        .await?;
                        UpsertOutcome::Inserted
                    }
                    Some(row) if user.needs_update(&user_from_row(&row)?) => {
                        let result = query(
                            "UPDATE twitter_users SET screen_name = ?, name = ?, lang = ?, updated_at = ? \
                             WHERE user_id = ?",
                        )
                        .bind(&user.screen_name)
                        .bind(&user.name)
                        .bind(&user.lang)
                        .bind(&now)
                        .bind(user_id)
                        .execute(&mut *tx)
                        .await?;
                        if result.rows_affected() == 0 {
                            return Err(StoreError::RowNotFound(user.user_id));
                        }
                        UpsertOutcome::Updated
                    }
                    Some(_) => UpsertOutcome::Unchanged,
                };

                tx.commit().await?;
                Ok(outcome)
            }
            SqlStore::Postgres(pool) => {
                let mut tx = pool.begin().await?;

                let existing = query(
                    "SELECT user_id, screen_name, name, lang FROM twitter_users \
                     WHERE user_id = $1 FOR UPDATE",
                )
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

                let outcome = match existing {
                    None => {
                        query(
                            r#"
                            INSERT INTO twitter_users (user_id, screen_name, name, lang, updated_at, created_at)
                            VALUES ($1, $2, $3, $4, NOW(), NOW())
                            ON CONFLICT (user_id) DO UPDATE SET
                                screen_name = EXCLUDED.screen_name,
                                name = EXCLUDED.name,
                                lang = EXCLUDED.lang,
                                updated_at = NOW()
                            "#,
                        )
                        .bind(user_id)
                        .bind(&user.screen_name)
                        .bind(&user.name)
                        .bind(&user.lang)
                        .execute(&mut *tx)
                        .await?;
                        UpsertOutcome::Inserted
                    }
                    Some(row) if user.needs_update(&user_from_row(&row)?) => {
                        let result = query(
                            "UPDATE twitter_users SET screen_name = $1, name = $2, lang = $3, updated_at = NOW() \
                             WHERE user_id = $4",
                        )
                        .bind(&user.screen_name)
                        .bind(&user.name)
                        .bind(&user.lang)
                        .bind(user_id)
                        .execute(&mut *tx)
                        .await?;
                        if result.rows_affected() == 0 {
                            return Err(StoreError::RowNotFound(user.user_id));
                        }
                        UpsertOutcome::Updated
                    }
                    Some(_) => UpsertOutcome::Unchanged,
                };

                tx.commit().await?;
                Ok(outcome)
            }
        }
    }
}

fn user_from_row<'r, R>(row: &'r R) -> Result<TwitterUser, StoreError>
where
    R: Row,
    &'r str: sqlx::ColumnIndex<R>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    Ok(TwitterUser {
        user_id: from_db_id(row.try_get("user_id")?),
        screen_name: row.try_get("screen_name")?,
        name: row.try_get("name")?,
        lang: row.try_get("lang")?,
    })
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("invalid timestamp {value:?}: {e}")))
}

fn decode_status(value: i64) -> Result<u16, StoreError> {
    u16::try_from(value).map_err(|_| StoreError::Decode(format!("invalid status code {value}")))
}

/// Ensure the parent directory of a file-backed SQLite DSN exists.
pub fn ensure_data_directory(dsn: &str) -> std::io::Result<()> {
    let Some(rest) = dsn.strip_prefix("sqlite:") else {
        return Ok(());
    };
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or_default();

    if path.is_empty() || path == ":memory:" || dsn.contains("mode=memory") {
        return Ok(());
    }

    let Some(parent) = Path::new(path).parent() else {
        return Ok(());
    };
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent)?;
        log::info!("Created data directory: {}", parent.display());
    }
    Ok(())
}
