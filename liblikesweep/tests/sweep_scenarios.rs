//! End-to-end sweep scenarios: Sweeper driving XClient against a mock server

use std::sync::Arc;
use std::time::{Duration, Instant};

use liblikesweep::api::x::XClient;
use liblikesweep::config::{ApiConfig, FileConfig};
use liblikesweep::events::EventReceiver;
use liblikesweep::{
    Config, EventBus, LikesweepError, StopReason, SweepEvent, SweepOptions, Sweeper,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIKES_PATH: &str = "/2/users/42/liked_tweets";

fn test_config(server: &MockServer) -> Arc<Config> {
    let lookup = |key: &str| match key {
        "TWITTER_ID" => Some("42".to_string()),
        other => Some(format!("{}-value", other.to_lowercase())),
    };
    let file = FileConfig {
        api: ApiConfig {
            base_url: format!("{}/2", server.uri()),
            ..ApiConfig::default()
        },
        ..FileConfig::default()
    };
    Arc::new(Config::from_lookup(lookup, file).unwrap())
}

fn drain(receiver: &mut EventReceiver) -> Vec<SweepEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// First fetch answers `first`, every later fetch answers an empty page
async fn mount_pages(server: &MockServer, first: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(LIKES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(LIKES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_items_deleted_then_refetch() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        json!({"data": [{"id": "1", "text": "a"}, {"id": "2", "text": "b"}]}),
    )
    .await;

    for id in ["1", "2"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/2/users/42/likes/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"liked": false}})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = test_config(&server);
    let client = XClient::new(config.clone()).unwrap();
    let events = EventBus::new();
    let mut receiver = events.subscribe();

    let summary = Sweeper::new(&client, &config.account_id, SweepOptions::default())
        .with_events(events)
        .run()
        .await
        .unwrap();

    let lines: Vec<String> = drain(&mut receiver)
        .iter()
        .filter(|e| matches!(e, SweepEvent::Retracted { .. } | SweepEvent::Exhausted))
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        lines,
        vec![
            "Deleted like for tweet: \"a\", status code: 200",
            "Deleted like for tweet: \"b\", status code: 200",
            "No more likes to delete.",
        ]
    );

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.retracted, 2);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);

    // Order on the wire: fetch, delete 1, delete 2, re-fetch
    let requests = server.received_requests().await.unwrap();
    let order: Vec<String> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        order,
        vec![
            format!("GET {}", LIKES_PATH),
            "DELETE /2/users/42/likes/1".to_string(),
            "DELETE /2/users/42/likes/2".to_string(),
            format!("GET {}", LIKES_PATH),
        ]
    );
}

#[tokio::test]
async fn test_empty_data_reports_once_and_exits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIKES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = XClient::new(config.clone()).unwrap();
    let events = EventBus::new();
    let mut receiver = events.subscribe();

    let summary = Sweeper::new(&client, &config.account_id, SweepOptions::default())
        .with_events(events)
        .run()
        .await
        .unwrap();

    let exhausted = drain(&mut receiver)
        .into_iter()
        .filter(|e| *e == SweepEvent::Exhausted)
        .count();
    assert_eq!(exhausted, 1);
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);
}

#[tokio::test]
async fn test_server_error_on_delete_continues_batch() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        json!({"data": [{"id": "1", "text": "a"}, {"id": "2", "text": "b"}]}),
    )
    .await;

    Mock::given(method("DELETE"))
        .and(path("/2/users/42/likes/1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/2/users/42/likes/2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = XClient::new(config.clone()).unwrap();

    let summary = Sweeper::new(&client, &config.account_id, SweepOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.retracted, 1);
}

#[tokio::test]
async fn test_rate_limit_with_past_reset_continues_immediately() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        json!({"data": [{"id": "1", "text": "a"}, {"id": "2", "text": "b"}]}),
    )
    .await;

    let past = chrono::Utc::now().timestamp() - 5;
    Mock::given(method("DELETE"))
        .and(path("/2/users/42/likes/1"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("x-rate-limit-reset", past.to_string()),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/2/users/42/likes/2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = XClient::new(config.clone()).unwrap();
    let events = EventBus::new();
    let mut receiver = events.subscribe();

    let started = Instant::now();
    let summary = Sweeper::new(&client, &config.account_id, SweepOptions::default())
        .with_events(events)
        .run()
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(summary.rate_limited, 1);
    assert!(drain(&mut receiver).contains(&SweepEvent::RateLimited {
        wait_secs: 0,
        reset_at: Some(past),
    }));
}

#[tokio::test]
async fn test_rate_limit_without_header_uses_fallback_wait() {
    let server = MockServer::start().await;
    mount_pages(
        &server,
        json!({"data": [{"id": "1", "text": "a"}, {"id": "2", "text": "b"}]}),
    )
    .await;

    Mock::given(method("DELETE"))
        .and(path("/2/users/42/likes/1"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/2/users/42/likes/2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = XClient::new(config.clone()).unwrap();
    let options = SweepOptions {
        default_rate_limit_wait: Duration::from_millis(300),
        ..SweepOptions::default()
    };

    let started = Instant::now();
    Sweeper::new(&client, &config.account_id, options)
        .run()
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_fetch_failure_aborts_without_deletes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\": [{\"id\": 1"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = XClient::new(config.clone()).unwrap();

    let err = Sweeper::new(&client, &config.account_id, SweepOptions::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, LikesweepError::Api(_)));
    assert_eq!(err.exit_code(), 1);
}
