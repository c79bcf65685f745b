use cinetask_model::TaskEvent;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::{ConnectionState, PushTransport, Subscription, SubscriptionHandle};
use crate::config::{ClientConfig, ReconnectPolicy};
use crate::error::{ClientError, ClientResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push transport over a WebSocket carrying JSON-encoded [`TaskEvent`]s,
/// one per text frame.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: Url,
    access_token: Option<String>,
    reconnect: ReconnectPolicy,
}

impl WebSocketTransport {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            access_token: None,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            url: config.events_url()?,
            access_token: config.access_token.clone(),
            reconnect: config.reconnect.clone(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl PushTransport for WebSocketTransport {
    fn subscribe(&self) -> Subscription {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let session = PushSession {
            url: self.url.clone(),
            access_token: self.access_token.clone(),
            reconnect: self.reconnect.clone(),
            events: events_tx,
            state: state_tx,
            retry_count: 0,
        };
        let task = tokio::spawn(session.run());

        Subscription {
            events,
            handle: SubscriptionHandle::new(state_rx, Some(task)),
        }
    }
}

enum SessionEnd {
    ReceiverGone,
    Disconnected(String),
}

/// Connection loop behind one subscription.
struct PushSession {
    url: Url,
    access_token: Option<String>,
    reconnect: ReconnectPolicy,
    events: mpsc::UnboundedSender<TaskEvent>,
    state: watch::Sender<ConnectionState>,
    retry_count: u32,
}

impl PushSession {
    async fn run(mut self) {
        loop {
            if self.retry_count > 0 {
                let delay = self.reconnect.backoff(self.retry_count);
                log::info!(
                    "Retrying task events connection after {:?} (attempt #{})",
                    delay,
                    self.retry_count + 1
                );
                tokio::time::sleep(delay).await;
            }

            self.state.send_replace(ConnectionState::Connecting);
            match self.connect().await {
                Ok(stream) => {
                    log::info!("Task events connection opened: {}", self.url);
                    self.retry_count = 0;
                    self.state.send_replace(ConnectionState::Open);

                    match self.read_frames(stream).await {
                        SessionEnd::ReceiverGone => {
                            log::debug!("Task event receiver dropped, closing");
                            break;
                        }
                        SessionEnd::Disconnected(reason) => {
                            log::warn!("Task events connection lost: {reason}");
                        }
                    }
                }
                Err(err) => {
                    log::error!(
                        "Task events connection to {} failed: {}",
                        self.url,
                        err
                    );
                }
            }

            if self.events.is_closed() {
                break;
            }
            self.retry_count += 1;
            if self.retry_count > self.reconnect.max_retries {
                log::error!("Max retries exceeded for task events connection");
                break;
            }
        }

        self.state.send_replace(ConnectionState::Closed);
    }

    async fn connect(&self) -> ClientResult<WsStream> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ClientError::WebSocket(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, _response) = connect_async(request).await?;
        Ok(stream)
    }

    async fn read_frames(&self, mut stream: WsStream) -> SessionEnd {
        loop {
            let frame = tokio::select! {
                _ = self.events.closed() => return SessionEnd::ReceiverGone,
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = decode_frame(text.as_str())
                        && self.events.send(event).is_err()
                    {
                        return SessionEnd::ReceiverGone;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| {
                            format!("{} {}", u16::from(f.code), f.reason.as_str())
                        })
                        .unwrap_or_else(|| "no close frame".to_string());
                    return SessionEnd::Disconnected(format!(
                        "closed by server ({reason})"
                    ));
                }
                // Ping replies are queued by tungstenite and flushed on the
                // next read.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    return SessionEnd::Disconnected(err.to_string());
                }
                None => {
                    return SessionEnd::Disconnected("stream ended".to_string());
                }
            }
        }
    }
}

/// Decodes one text frame, dropping keepalives and anything malformed.
pub(crate) fn decode_frame(data: &str) -> Option<TaskEvent> {
    let data = data.trim();
    if data.is_empty() || data == "keepalive" {
        log::trace!("Received task events keepalive");
        return None;
    }

    match TaskEvent::decode(data) {
        Ok(event) => Some(event),
        Err(e) => {
            log::debug!("Dropping malformed task event: {} - Data: {}", e, data);
            None
        }
    }
}
