use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tokio::fs;
use tower::ServiceExt;
use traceviz_daemon::{Coordinator, DaemonConfig, router};

fn unique_test_root(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("{name}-{nanos}"))
}

async fn post_event(app: &Router, body: impl Into<Body>) -> Result<(StatusCode, Vec<u8>)> {
    let request = Request::builder()
        .method("POST")
        .uri("/event")
        .header("content-type", "application/json")
        .body(body.into())?;
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, bytes.to_vec()))
}

async fn get_json(app: &Router, uri: &str) -> Result<Value> {
    let request = Request::builder().uri(uri).body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn submit(app: &Router, payload: Value) -> Result<StatusCode> {
    let (status, _) = post_event(app, payload.to_string()).await?;
    Ok(status)
}

#[tokio::test]
async fn health_reports_ok() -> Result<()> {
    let root = unique_test_root("traceviz-http-health");
    let coordinator = Coordinator::start(&DaemonConfig::new(&root)).await?;
    let app = router(coordinator.clone(), None);

    let request = Request::builder().uri("/health").body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"ok");

    coordinator.shutdown().await;
    let _ = fs::remove_dir_all(root).await;
    Ok(())
}

#[tokio::test]
async fn hook_sequence_builds_history_and_stats() -> Result<()> {
    let root = unique_test_root("traceviz-http-sequence");
    let coordinator = Coordinator::start(&DaemonConfig::new(&root)).await?;
    let app = router(coordinator.clone(), None);

    let status = submit(
        &app,
        json!({"hook": "Notification", "message": "hi", "session_id": "s1"}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let events = get_json(&app, "/events").await?;
    assert_eq!(events.as_array().map(Vec::len), Some(1));
    assert_eq!(events[0]["type"], "notification");

    submit(
        &app,
        json!({"hook": "PreToolUse", "tool_name": "Bash", "session_id": "s1"}),
    )
    .await?;
    submit(
        &app,
        json!({"hook": "PostToolUse", "tool_name": "Bash", "duration_ms": 250, "session_id": "s1"}),
    )
    .await?;

    let events = get_json(&app, "/events").await?;
    let tool_ends: Vec<&Value> = events
        .as_array()
        .into_iter()
        .flatten()
        .filter(|event| event["type"] == "tool_end")
        .collect();
    assert_eq!(tool_ends.len(), 1);
    assert_eq!(tool_ends[0]["durationMs"], 250);
    assert_eq!(tool_ends[0]["toolType"], "bash");

    let stats = get_json(&app, "/stats").await?;
    assert_eq!(stats["toolCallCount"], 1);
    assert_eq!(stats["toolCallsByType"]["bash"], 1);
    assert_eq!(stats["toolCallsByType"]["file"], 0);
    assert_eq!(stats["sessionId"], coordinator.session_id().as_str());

    submit(
        &app,
        json!({
            "hook": "PreToolUse",
            "tool_name": "Task",
            "tool_input": {"subagent_id": "a1"},
            "session_id": "s1"
        }),
    )
    .await?;
    let events = get_json(&app, "/events").await?;
    let last = &events[3];
    assert_eq!(last["type"], "agent_spawn");
    assert_eq!(last["childAgentId"], "a1");
    let tool_starts = events
        .as_array()
        .into_iter()
        .flatten()
        .filter(|event| event["type"] == "tool_start")
        .count();
    assert_eq!(tool_starts, 1);

    coordinator.shutdown().await;
    let _ = fs::remove_dir_all(root).await;
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_a_client_error_without_side_effects() -> Result<()> {
    let root = unique_test_root("traceviz-http-malformed");
    let coordinator = Coordinator::start(&DaemonConfig::new(&root)).await?;
    let app = router(coordinator.clone(), None);

    submit(&app, json!({"hook": "Notification", "message": "before"})).await?;
    let (status, body) = post_event(&app, "not-json").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body)?;
    assert_eq!(error["error"], "invalid json");
    assert_eq!(coordinator.events().len(), 1);

    coordinator.shutdown().await;
    let _ = fs::remove_dir_all(root).await;
    Ok(())
}

#[tokio::test]
async fn unknown_hook_is_accepted_as_noop() -> Result<()> {
    let root = unique_test_root("traceviz-http-unknown");
    let coordinator = Coordinator::start(&DaemonConfig::new(&root)).await?;
    let app = router(coordinator.clone(), None);

    submit(&app, json!({"hook": "PostToolUse", "tool_name": "Read"})).await?;
    let stats_before = get_json(&app, "/stats").await?;

    for payload in [
        json!({"hook": "Unknown"}),
        json!({"message": "no hook at all"}),
        json!({"hook": "__replay__", "toolName": "Bash"}),
        json!([1, 2, 3]),
    ] {
        assert_eq!(submit(&app, payload).await?, StatusCode::OK);
    }

    assert_eq!(get_json(&app, "/events").await?.as_array().map(Vec::len), Some(1));
    assert_eq!(get_json(&app, "/stats").await?, stats_before);

    coordinator.shutdown().await;
    let _ = fs::remove_dir_all(root).await;
    Ok(())
}

#[tokio::test]
async fn unmatched_paths_are_not_found_without_web_dist() -> Result<()> {
    let root = unique_test_root("traceviz-http-404");
    let coordinator = Coordinator::start(&DaemonConfig::new(&root)).await?;
    let app = router(coordinator.clone(), None);

    for uri in ["/", "/index.html", "/assets/app.js"] {
        let request = Request::builder().uri(uri).body(Body::empty())?;
        let response = app.clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    coordinator.shutdown().await;
    let _ = fs::remove_dir_all(root).await;
    Ok(())
}

#[tokio::test]
async fn web_dist_serves_dashboard_assets() -> Result<()> {
    let root = unique_test_root("traceviz-http-dist");
    let dist = root.join("dist");
    fs::create_dir_all(&dist).await?;
    fs::write(dist.join("index.html"), "<html>dashboard</html>").await?;
    fs::write(dist.join("app.js"), "console.log('hi')").await?;

    let coordinator = Coordinator::start(&DaemonConfig::new(root.join("logs"))).await?;
    let app = router(coordinator.clone(), Some(dist));

    let request = Request::builder().uri("/").body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"<html>dashboard</html>");

    let request = Request::builder().uri("/app.js").body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // API routes still win over static files.
    assert_eq!(get_json(&app, "/events").await?, json!([]));

    coordinator.shutdown().await;
    let _ = fs::remove_dir_all(root).await;
    Ok(())
}

#[tokio::test]
async fn large_tool_output_is_accepted() -> Result<()> {
    let root = unique_test_root("traceviz-http-large");
    let coordinator = Coordinator::start(&DaemonConfig::new(&root)).await?;
    let app = router(coordinator.clone(), None);

    let output = "x".repeat(3 * 1024 * 1024);
    let status = submit(
        &app,
        json!({"hook": "PostToolUse", "tool_name": "Read", "tool_response": {"output": output}}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let events = get_json(&app, "/events").await?;
    assert_eq!(events[0]["outputSize"], 3 * 1024 * 1024);
    let stats = get_json(&app, "/stats").await?;
    assert_eq!(stats["toolCallsByType"]["file"], 1);

    coordinator.shutdown().await;
    let _ = fs::remove_dir_all(root).await;
    Ok(())
}

#[tokio::test]
async fn replayed_fields_reach_history_and_log() -> Result<()> {
    let root = unique_test_root("traceviz-http-replay-extra");
    let coordinator = Coordinator::start(&DaemonConfig::new(&root)).await?;
    let app = router(coordinator.clone(), None);

    let status = submit(
        &app,
        json!({
            "hook": "__replay__",
            "id": "old",
            "sessionId": "s",
            "agentId": "a",
            "timestamp": 1,
            "type": "compact_start",
            "tokensBefore": 10,
            "tokensAfter": 5,
            "extra": "keep"
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let events = get_json(&app, "/events").await?;
    assert_eq!(events[0]["tokensAfter"], 5);
    assert_eq!(events[0]["extra"], "keep");

    coordinator.shutdown().await;
    let logged = fs::read_to_string(coordinator.log_path()).await?;
    let line: Value = serde_json::from_str(logged.trim())?;
    assert_eq!(line["tokensAfter"], 5);
    assert_eq!(line["extra"], "keep");
    assert_ne!(line["id"], "old");

    let _ = fs::remove_dir_all(root).await;
    Ok(())
}
