mod support;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use cinetask_client::{ApiClient, ClientConfig, ClientError, TaskSource};
use serde_json::json;
use support::{download_json, spawn_http};

fn config_for(addr: std::net::SocketAddr, tasks_path: &str) -> ClientConfig {
    ClientConfig {
        server_url: format!("{addr}"),
        tasks_path: tasks_path.to_string(),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn fetches_bare_task_array() {
    let router = Router::new().route(
        "/api/tasks",
        get(|| async {
            Json(json!([
                download_json("t1", "running", "2024-05-01T10:00:00Z", "m1", 5),
                {
                    "id": "u1",
                    "task_type": "upload",
                    "status": "queued",
                    "progress": null,
                    "payload": {}
                }
            ]))
        }),
    );
    let addr = spawn_http(router).await;

    let client = ApiClient::new(&config_for(addr, "/api/tasks")).unwrap();
    let tasks = client.fetch_tasks().await.unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id.as_str(), "t1");
    assert!(tasks[0].status.is_running());
    assert_eq!(tasks[1].status.as_str(), "queued");
}

#[tokio::test]
async fn fetches_enveloped_listing() {
    let router = Router::new().route(
        "/v2/tasks",
        get(|| async {
            Json(json!({
                "data": [download_json(
                    "t9", "pending", "2024-05-01T10:00:00Z", "m9", 0
                )]
            }))
        }),
    );
    let addr = spawn_http(router).await;

    let client = ApiClient::new(&config_for(addr, "v2/tasks")).unwrap();
    let tasks = client.fetch_tasks().await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id.as_str(), "t9");
}

#[tokio::test]
async fn sends_bearer_token() {
    let router = Router::new().route(
        "/api/tasks",
        get(|headers: HeaderMap| async move {
            match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                Some("Bearer let-me-in") => (StatusCode::OK, Json(json!([]))),
                _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "auth"}))),
            }
        }),
    );
    let addr = spawn_http(router).await;

    let anonymous = ApiClient::new(&config_for(addr, "/api/tasks")).unwrap();
    assert!(matches!(
        anonymous.fetch_tasks().await,
        Err(ClientError::Status { status, .. }) if status == StatusCode::UNAUTHORIZED
    ));

    let mut config = config_for(addr, "/api/tasks");
    config.access_token = Some("let-me-in".into());
    let authed = ApiClient::new(&config).unwrap();
    assert!(authed.fetch_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let router = Router::new().route(
        "/api/tasks",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "queue offline") }),
    );
    let addr = spawn_http(router).await;

    let client = ApiClient::new(&config_for(addr, "/api/tasks")).unwrap();
    match client.fetch_tasks().await {
        Err(ClientError::Status { status, body }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "queue offline");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_listing_is_a_decode_error() {
    let router = Router::new().route(
        "/api/tasks",
        get(|| async { Json(json!({ "tasks": "nope" })) }),
    );
    let addr = spawn_http(router).await;

    let client = ApiClient::new(&config_for(addr, "/api/tasks")).unwrap();
    assert!(matches!(
        client.fetch_tasks().await,
        Err(ClientError::Decode(_))
    ));
}
