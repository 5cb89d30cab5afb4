//! HTTP API integration tests.
//!
//! Exercise the public endpoints against a real server spawned by
//! `TestClickServer`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use click_test_utils::{SseReader, TestClickServer};
use serde_json::{json, Value};
use std::time::Duration;

const EVENT_WAIT: Duration = Duration::from_secs(2);

async fn post_increment(client: &reqwest::Client, server: &TestClickServer) -> reqwest::Response {
    client
        .post(format!("{}/api/v1/counter/increment", server.url()))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_read_counter_returns_snapshot() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(5, 10).await?;

    let response = reqwest::get(format!("{}/api/v1/counter", server.url())).await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"count": 5, "goal": 10}));

    Ok(())
}

#[tokio::test]
async fn test_increment_reports_outcomes_up_to_goal() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(8, 10).await?;
    let client = reqwest::Client::new();

    let body: Value = post_increment(&client, &server).await.json().await?;
    assert_eq!(body, json!({"count": 9, "goal": 10, "outcome": "committed"}));

    let body: Value = post_increment(&client, &server).await.json().await?;
    assert_eq!(body["outcome"], "committed");
    assert_eq!(body["count"], 10);

    let response = post_increment(&client, &server).await;
    assert_eq!(response.status(), 200, "Clicking at the goal is not an error");
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"count": 10, "goal": 10, "outcome": "at_goal"}));

    Ok(())
}

#[tokio::test]
async fn test_claim_flow_over_http() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(10, 10).await?;
    let client = reqwest::Client::new();
    let winner_url = format!("{}/api/v1/winner", server.url());

    let body: Value = client.get(&winner_url).send().await?.json().await?;
    assert_eq!(body, Value::Null);

    let response = client
        .post(&winner_url)
        .json(&json!({"identity": "alice@example.com"}))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["accepted"], true);
    assert_eq!(body["winner"]["identity"], "alice@example.com");
    assert!(body["winner"]["claimedAt"].is_string());
    assert!(body.get("reason").is_none());

    let body: Value = client
        .post(&winner_url)
        .json(&json!({"identity": "bob@example.com"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["accepted"], false);
    assert_eq!(body["reason"], "already_claimed");
    assert_eq!(body["winner"]["identity"], "alice@example.com");

    let body: Value = client.get(&winner_url).send().await?.json().await?;
    assert_eq!(body["identity"], "alice@example.com");

    // Clicks after the winner change nothing
    let body: Value = post_increment(&client, &server).await.json().await?;
    assert_eq!(body["outcome"], "winner_declared");

    Ok(())
}

#[tokio::test]
async fn test_claim_before_goal_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(3, 10).await?;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/v1/winner", server.url()))
        .json(&json!({"identity": "early@example.com"}))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body, json!({"accepted": false, "reason": "goal_not_reached"}));

    Ok(())
}

#[tokio::test]
async fn test_invalid_claims_are_bad_requests() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(10, 10).await?;
    let client = reqwest::Client::new();
    let winner_url = format!("{}/api/v1/winner", server.url());

    for body in [
        json!({"identity": ""}),
        json!({"identity": "   "}),
        json!({"name": "alice"}),
    ] {
        let response = client.post(&winner_url).json(&body).send().await?;
        assert_eq!(response.status(), 400, "body {body} must be rejected");
        let error: Value = response.json().await?;
        assert_eq!(error["error"]["code"], "INVALID_IDENTITY");
    }

    let response = client
        .post(&winner_url)
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    // Nothing was claimed along the way
    assert!(server.coordinator().winner_snapshot().is_none());

    Ok(())
}

#[tokio::test]
async fn test_counter_events_stream_snapshots() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(5, 10).await?;
    let mut events = SseReader::connect(&format!("{}/api/v1/counter/events", server.url())).await?;

    let first = events.expect_event(EVENT_WAIT).await?;
    assert_eq!(first.event, "counter");
    assert_eq!(first.data, json!({"count": 5, "goal": 10}));

    server.coordinator().increment().await?;

    let next = events.expect_event(EVENT_WAIT).await?;
    assert_eq!(next.data["count"], 6);

    Ok(())
}

#[tokio::test]
async fn test_counter_events_quiet_at_goal() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(10, 10).await?;
    let mut events = SseReader::connect(&format!("{}/api/v1/counter/events", server.url())).await?;
    assert_eq!(events.expect_event(EVENT_WAIT).await?.data["count"], 10);

    server.coordinator().increment().await?;

    assert!(!events.has_event_within(Duration::from_millis(300)).await?);

    Ok(())
}

#[tokio::test]
async fn test_winner_events_deliver_once_and_close() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(10, 10).await?;
    let mut events = SseReader::connect(&format!("{}/api/v1/winner/events", server.url())).await?;

    server.coordinator().claim_winner("alice@example.com").await?;

    let event = events.expect_event(EVENT_WAIT).await?;
    assert_eq!(event.event, "winner");
    assert_eq!(event.data["identity"], "alice@example.com");

    let after = tokio::time::timeout(EVENT_WAIT, events.next_event()).await??;
    assert!(after.is_none(), "Winner stream ends after its only event");

    Ok(())
}

#[tokio::test]
async fn test_shutdown_ends_event_streams() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(0, 10).await?;
    let mut events = SseReader::connect(&format!("{}/api/v1/counter/events", server.url())).await?;
    events.expect_event(EVENT_WAIT).await?;

    server.begin_shutdown();

    let after = tokio::time::timeout(EVENT_WAIT, events.next_event()).await??;
    assert!(after.is_none());

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_and_unknown_route() -> Result<(), anyhow::Error> {
    let server = TestClickServer::spawn_with_count(0, 10).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);

    let response = reqwest::get(format!("{}/api/v1/nonexistent", server.url())).await?;
    assert_eq!(response.status(), 404);

    Ok(())
}
