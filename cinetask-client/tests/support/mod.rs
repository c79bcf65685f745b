#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::protocol::Message;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn download_json(
    id: &str,
    status: &str,
    created_at: &str,
    media: &str,
    progress: i64,
) -> Value {
    json!({
        "id": id,
        "task_type": "download",
        "status": status,
        "created_at": created_at,
        "progress": progress,
        "payload": { "media_id": media }
    })
}

/// Serves `router` on an ephemeral local port.
pub async fn spawn_http(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind http");
    let addr = listener.local_addr().expect("http addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("http server");
    });
    addr
}

/// What the scripted WebSocket server does once it has sent its frames.
#[derive(Debug, Clone, Copy)]
pub enum AfterFrames {
    HoldOpen,
    Close,
}

/// Scripted push server: every connection receives the same text frames.
#[derive(Debug, Clone)]
pub struct WsServer {
    pub addr: SocketAddr,
    pub auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

impl WsServer {
    pub fn url(&self) -> url::Url {
        url::Url::parse(&format!("ws://{}/ws", self.addr)).expect("ws url")
    }

    pub fn connection_count(&self) -> usize {
        self.auth_headers.lock().len()
    }
}

pub async fn spawn_ws(frames: Vec<String>, after: AfterFrames) -> WsServer {
    spawn_ws_gated(frames, after, None).await
}

/// Like [`spawn_ws`], but each connection waits for `gate` to be notified
/// before sending its frames.
pub async fn spawn_ws_gated(
    frames: Vec<String>,
    after: AfterFrames,
    gate: Option<Arc<Notify>>,
) -> WsServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ws");
    let addr = listener.local_addr().expect("ws addr");
    let auth_headers = Arc::new(Mutex::new(Vec::new()));

    let seen = auth_headers.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let frames = frames.clone();
            let seen = seen.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                let callback = |req: &Request, resp: Response| {
                    let header = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().push(header);
                    Ok::<Response, ErrorResponse>(resp)
                };
                let Ok(mut ws) =
                    tokio_tungstenite::accept_hdr_async(stream, callback).await
                else {
                    return;
                };

                if let Some(gate) = gate {
                    gate.notified().await;
                }

                for frame in frames {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }

                match after {
                    AfterFrames::HoldOpen => {
                        while let Some(Ok(_)) = ws.next().await {}
                    }
                    AfterFrames::Close => {
                        let _ = ws.close(None).await;
                    }
                }
            });
        }
    });

    WsServer { addr, auth_headers }
}

/// A local port with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("addr")
}
