//! SDK tests against an in-process fake of the REST endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use twitter_sdk::{SdkError, TimelineQuery, TwitterClient};

const TOKEN: &str = "test-token";

#[derive(Clone, Default)]
struct FakeState {
    requests: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
}

impl FakeState {
    fn record(&self, path: &str, params: HashMap<String, String>) {
        self.requests.lock().unwrap().push((path.to_string(), params));
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn api_error(status: StatusCode, code: i64, message: &str) -> Response {
    (
        status,
        Json(json!({"errors": [{"code": code, "message": message}]})),
    )
        .into_response()
}

async fn destroy(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Path(file): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.record(&format!("destroy/{file}"), params);
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, 89, "Invalid or expired token.");
    }
    let Some(id) = file.strip_suffix(".json").and_then(|id| id.parse::<u64>().ok()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if id == 404 {
        return api_error(StatusCode::NOT_FOUND, 144, "No status found with that ID.");
    }
    Json(json!({
        "id": id,
        "id_str": id.to_string(),
        "text": format!("tweet {id}"),
        "created_at": "Wed Aug 27 13:08:45 +0000 2008",
        "user": {"id": 42}
    }))
    .into_response()
}

async fn timeline(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.record("user_timeline", params.clone());
    let max_id = params
        .get("max_id")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(u64::MAX);
    let tweets: Vec<_> = [300u64, 200, 100]
        .into_iter()
        .filter(|id| *id <= max_id)
        .take(2)
        .map(|id| json!({"id": id, "text": "", "created_at": "Wed Aug 27 13:08:45 +0000 2008"}))
        .collect();
    Json(tweets).into_response()
}

async fn verify_credentials(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.record("verify_credentials", params);
    Json(json!({
        "id": 42,
        "id_str": "42",
        "name": "name",
        "screen_name": "screen_name",
        "lang": null
    }))
    .into_response()
}

async fn update(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let status = params.get("status").cloned().unwrap_or_default();
    state.record("update", params);
    Json(json!({"id": 9000, "text": status, "created_at": "Wed Aug 27 13:08:45 +0000 2008"}))
        .into_response()
}

async fn start_fake() -> (SocketAddr, FakeState) {
    let state = FakeState::default();
    let app = Router::new()
        .route("/1.1/statuses/destroy/:file", post(destroy))
        .route("/1.1/statuses/user_timeline.json", get(timeline))
        .route("/1.1/account/verify_credentials.json", get(verify_credentials))
        .route("/1.1/statuses/update.json", post(update))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn client(addr: SocketAddr, token: &str) -> TwitterClient {
    TwitterClient::new(&format!("http://{addr}/1.1"), token, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_delete_tweet() {
    let (addr, state) = start_fake().await;

    let tweet = client(addr, TOKEN).delete_tweet(123, true).await.unwrap();
    assert_eq!(tweet.id, 123);
    assert_eq!(tweet.text, "tweet 123");
    assert_eq!(tweet.user_id(), Some(42));
    assert!(tweet.created_at_time().is_ok());

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests[0].0, "destroy/123.json");
    assert_eq!(requests[0].1.get("trim_user").map(String::as_str), Some("true"));
}

#[tokio::test]
async fn test_delete_missing_tweet_reports_status() {
    let (addr, _state) = start_fake().await;

    let err = client(addr, TOKEN).delete_tweet(404, true).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    match err {
        SdkError::Api { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("No status found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let (addr, _state) = start_fake().await;

    let err = client(addr, "wrong").delete_tweet(1, true).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_user_timeline_paging_params() {
    let (addr, state) = start_fake().await;
    let client = client(addr, TOKEN);

    let mut query = TimelineQuery::new(42);
    let first = client.user_timeline(&query).await.unwrap();
    assert_eq!(first.iter().map(|t| t.id).collect::<Vec<_>>(), vec![300, 200]);

    query.max_id = Some(199);
    let second = client.user_timeline(&query).await.unwrap();
    assert_eq!(second.iter().map(|t| t.id).collect::<Vec<_>>(), vec![100]);

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].1.get("user_id").map(String::as_str), Some("42"));
    assert_eq!(requests[0].1.get("count").map(String::as_str), Some("200"));
    assert!(requests[0].1.get("max_id").is_none());
    assert_eq!(requests[1].1.get("max_id").map(String::as_str), Some("199"));
}

#[tokio::test]
async fn test_verify_credentials() {
    let (addr, state) = start_fake().await;

    let user = client(addr, TOKEN).verify_credentials().await.unwrap();
    assert_eq!(user.id, 42);
    assert_eq!(user.screen_name, "screen_name");
    assert_eq!(user.lang, None);

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests[0].1.get("skip_status").map(String::as_str), Some("true"));
}

#[tokio::test]
async fn test_post_tweet() {
    let (addr, state) = start_fake().await;

    let tweet = client(addr, TOKEN).post_tweet("hello world").await.unwrap();
    assert_eq!(tweet.id, 9000);
    assert_eq!(tweet.text, "hello world");

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests[0].0, "update");
}

#[tokio::test]
async fn test_connection_refused_has_no_status() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, TOKEN).verify_credentials().await.unwrap_err();
    assert!(matches!(err, SdkError::Http(_)));
    assert_eq!(err.status(), None);
}
