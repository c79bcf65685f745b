mod support;

use cinetask_client::model::{MediaKey, TaskEvent};
use cinetask_client::{
    ConnectionState, PushTransport, ReconnectPolicy, WebSocketTransport,
};
use serde_json::json;
use support::{AfterFrames, TIMEOUT, spawn_ws, unused_addr};
use tokio::sync::watch;
use tokio::time::timeout;

fn no_retries() -> ReconnectPolicy {
    ReconnectPolicy {
        max_retries: 0,
        max_backoff_secs: 1,
    }
}

async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    wanted: ConnectionState,
) {
    timeout(TIMEOUT, rx.wait_for(|state| *state == wanted))
        .await
        .expect("state change in time")
        .expect("transport still reporting");
}

#[tokio::test]
async fn delivers_decoded_events_and_skips_noise() {
    let server = spawn_ws(
        vec![
            "keepalive".into(),
            r#"{"type":"download_progress","task_id":"t1","progress":40}"#.into(),
            "{not json".into(),
            r#"{"type":"download_progress","media_id":7,"progress":3}"#.into(),
            r#"{"type":"library_rescan"}"#.into(),
            r#"{"type":"download_completed","task_id":"t1"}"#.into(),
        ],
        AfterFrames::HoldOpen,
    )
    .await;

    let transport = WebSocketTransport::new(server.url());
    let mut subscription = transport.subscribe();
    let mut state = subscription.handle.watch_state();
    wait_for_state(&mut state, ConnectionState::Open).await;

    let mut received = Vec::new();
    for _ in 0..4 {
        let event = timeout(TIMEOUT, subscription.events.recv())
            .await
            .expect("event in time")
            .expect("stream open");
        received.push(event);
    }

    assert_eq!(
        received,
        vec![
            TaskEvent::progress(Some("t1".into()), None, json!(40)),
            TaskEvent::progress(None, Some(MediaKey::from("7")), json!(3)),
            TaskEvent::Unknown,
            TaskEvent::DownloadCompleted {
                task_id: Some("t1".into())
            },
        ]
    );
    assert!(subscription.handle.is_live());
}

#[tokio::test]
async fn sends_bearer_token_on_handshake() {
    let server = spawn_ws(vec![], AfterFrames::HoldOpen).await;

    let transport =
        WebSocketTransport::new(server.url()).with_token("session-token");
    let subscription = transport.subscribe();
    let mut state = subscription.handle.watch_state();
    wait_for_state(&mut state, ConnectionState::Open).await;

    let headers = server.auth_headers.lock().clone();
    assert_eq!(headers, vec![Some("Bearer session-token".to_string())]);
}

#[tokio::test]
async fn closes_after_server_hangs_up_without_retries() {
    let server = spawn_ws(
        vec![r#"{"type":"download_started"}"#.into()],
        AfterFrames::Close,
    )
    .await;

    let transport =
        WebSocketTransport::new(server.url()).with_reconnect(no_retries());
    let mut subscription = transport.subscribe();

    let first = timeout(TIMEOUT, subscription.events.recv())
        .await
        .expect("event in time");
    assert_eq!(first, Some(TaskEvent::DownloadStarted { task_id: None }));

    let mut state = subscription.handle.watch_state();
    wait_for_state(&mut state, ConnectionState::Closed).await;
    assert!(!subscription.handle.is_live());

    let end = timeout(TIMEOUT, subscription.events.recv())
        .await
        .expect("stream end in time");
    assert!(end.is_none());
}

#[tokio::test]
async fn reconnects_after_disconnect() {
    let server = spawn_ws(
        vec![r#"{"type":"download_failed"}"#.into()],
        AfterFrames::Close,
    )
    .await;

    let transport =
        WebSocketTransport::new(server.url()).with_reconnect(ReconnectPolicy {
            max_retries: 3,
            max_backoff_secs: 1,
        });
    let mut subscription = transport.subscribe();

    for _ in 0..2 {
        let event = timeout(TIMEOUT, subscription.events.recv())
            .await
            .expect("event in time");
        assert_eq!(event, Some(TaskEvent::DownloadFailed { task_id: None }));
    }
    assert!(server.connection_count() >= 2);
}

#[tokio::test]
async fn unreachable_server_ends_closed() {
    let addr = unused_addr().await;
    let url = url::Url::parse(&format!("ws://{addr}/ws")).unwrap();

    let transport = WebSocketTransport::new(url).with_reconnect(no_retries());
    let subscription = transport.subscribe();
    assert_eq!(subscription.handle.state(), ConnectionState::Connecting);

    let mut state = subscription.handle.watch_state();
    wait_for_state(&mut state, ConnectionState::Closed).await;
}
