//! End-to-end erasure runs against the fake API and a real SQLite store.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::store::{OutcomeStore, SqlStore};
use common::testing::TestConfigBuilder;
use eraser::error::{EraserError, RemoteError, SourceError};
use eraser::testing::FakeTweetApi;
use eraser::{ErasureClient, IdSource};
use twitter_sdk::User;

const OWNER: u64 = 42;

fn write_archive(dir: &Path, ids: &[u64]) -> PathBuf {
    let path = dir.join("twitter-export.zip");
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    let options = zip::write::SimpleFileOptions::default();

    zip.start_file("README.txt", options).unwrap();
    zip.write_all(b"export").unwrap();

    zip.start_file("tweets.csv", options).unwrap();
    writeln!(zip, "tweet_id,in_reply_to_status_id,timestamp,text").unwrap();
    for id in ids {
        writeln!(zip, "{id},,2019-01-01 00:00:00 +0000,\"tweet, {id}\"").unwrap();
    }
    zip.finish().unwrap();
    path
}

fn client(api: &Arc<FakeTweetApi>, store: &Arc<SqlStore>, batch: usize) -> ErasureClient {
    let config = TestConfigBuilder::new()
        .with_trial_batch_size(batch)
        .with_dedup_chunk_size(3)
        .build();
    ErasureClient::new(
        api.clone(),
        Some(store.clone() as Arc<dyn OutcomeStore>),
        config.eraser,
    )
}

#[tokio::test]
async fn test_archive_run_records_and_skips_on_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let ids: Vec<u64> = (1..=10).collect();
    let path = write_archive(dir.path(), &ids);
    let store = Arc::new(SqlStore::new_in_memory().await.unwrap());

    // 7 is gone already; 9 fails transiently.
    let first = Arc::new(
        FakeTweetApi::new()
            .failing(7, RemoteError::new(Some(404), "No status found with that ID."))
            .failing(9, RemoteError::new(Some(503), "Over capacity")),
    );
    let err = client(&first, &store, 4)
        .run(&IdSource::Archive(path.clone()), true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EraserError::Incomplete {
            failed: 2,
            attempted: 10
        }
    ));

    let erased = store.erase_tweets(OWNER).await.unwrap();
    assert_eq!(erased.len(), 8);
    assert!(erased.iter().all(|t| t.tweet.starts_with("tweet ")));
    let errors = store.erase_errors(OWNER).await.unwrap();
    assert_eq!(errors.len(), 2);

    let owner = store.twitter_user(OWNER).await.unwrap().unwrap();
    assert_eq!(owner.user.screen_name, "screen_name");

    // Only the transient failure is retried.
    let second = Arc::new(FakeTweetApi::new());
    let summary = client(&second, &store, 4)
        .run(&IdSource::Archive(path.clone()), true)
        .await
        .unwrap();
    assert_eq!(summary.attempted, 1);
    assert_eq!(second.deletes(), vec![(9, true)]);

    // Nothing is left on a third run.
    let third = Arc::new(FakeTweetApi::new());
    let summary = client(&third, &store, 4)
        .run(&IdSource::Archive(path), true)
        .await
        .unwrap();
    assert_eq!(summary.attempted, 0);
    assert_eq!(third.delete_count(), 0);
}

#[tokio::test]
async fn test_records_are_scoped_to_the_owner() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_archive(dir.path(), &[1, 2, 3]);
    let store = Arc::new(SqlStore::new_in_memory().await.unwrap());

    let first = Arc::new(FakeTweetApi::new());
    client(&first, &store, 10)
        .run(&IdSource::Archive(path.clone()), true)
        .await
        .unwrap();

    let other_account = Arc::new(FakeTweetApi::new().with_user(User {
        id: 7,
        name: "other".into(),
        screen_name: "other".into(),
        lang: None,
    }));
    let summary = client(&other_account, &store, 10)
        .run(&IdSource::Archive(path), true)
        .await
        .unwrap();
    assert_eq!(summary.attempted, 3);

    let other = store.twitter_user(7).await.unwrap().unwrap();
    assert_eq!(other.user.lang, "");
}

#[tokio::test]
async fn test_profile_change_updates_owner() {
    let store = Arc::new(SqlStore::new_in_memory().await.unwrap());

    let before = Arc::new(FakeTweetApi::new());
    client(&before, &store, 10)
        .run(&IdSource::Timeline, true)
        .await
        .unwrap();
    let inserted = store.twitter_user(OWNER).await.unwrap().unwrap();

    let after = Arc::new(FakeTweetApi::new().with_user(User {
        id: OWNER,
        name: "renamed".into(),
        screen_name: "screen_name".into(),
        lang: Some("en".into()),
    }));
    client(&after, &store, 10)
        .run(&IdSource::Timeline, true)
        .await
        .unwrap();

    let updated = store.twitter_user(OWNER).await.unwrap().unwrap();
    assert_eq!(updated.user.name, "renamed");
    assert_eq!(updated.created_at, inserted.created_at);
}

#[tokio::test]
async fn test_timeline_run_with_batches() {
    let store = Arc::new(SqlStore::new_in_memory().await.unwrap());
    let ids: Vec<u64> = (1..=450).collect();
    let api = Arc::new(FakeTweetApi::new().with_timeline(ids.clone()));

    let summary = client(&api, &store, 200)
        .run(&IdSource::Timeline, true)
        .await
        .unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.erased, 450);
    assert!(api.max_in_flight() <= 200);

    // 200 + 200 + 50 + empty page
    let cursors: Vec<Option<u64>> = api.timeline_queries().iter().map(|q| q.max_id).collect();
    assert_eq!(cursors, vec![None, Some(250), Some(50), Some(0)]);

    assert_eq!(store.erase_tweets(OWNER).await.unwrap().len(), 450);
}

#[tokio::test]
async fn test_malformed_export_deletes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tweets.csv");
    std::fs::write(&path, "tweet_id,text\n1,a\nnot-an-id,b\n").unwrap();
    let store = Arc::new(SqlStore::new_in_memory().await.unwrap());
    let api = Arc::new(FakeTweetApi::new());

    let err = client(&api, &store, 10)
        .run(&IdSource::Table(path), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EraserError::Source(SourceError::MalformedInput { row: 3, .. })
    ));
    assert_eq!(api.delete_count(), 0);
}
