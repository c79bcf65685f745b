//! Transport seams consumed by the task store.
//!
//! The store only sees two collaborators: a [`TaskSource`] that returns the
//! full task listing, and a [`PushTransport`] that yields decoded
//! [`TaskEvent`]s. Both are implemented over the network in this crate
//! ([`crate::api_client::ApiClient`], [`websocket::WebSocketTransport`]) and
//! faked in tests.

pub mod websocket;

use async_trait::async_trait;
use cinetask_model::{Task, TaskEvent};
use std::fmt::{self, Debug};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::ClientResult;

/// Authoritative bulk listing of every task visible to the session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskSource: Send + Sync + Debug {
    async fn fetch_tasks(&self) -> ClientResult<Vec<Task>>;
}

/// Opens push-event subscriptions.
pub trait PushTransport: Send + Sync + Debug {
    /// Starts a new subscription and returns without waiting for the
    /// connection; the handle reports [`ConnectionState::Connecting`] until
    /// the transport resolves it.
    ///
    /// Must be called from within a tokio runtime.
    fn subscribe(&self) -> Subscription;
}

/// Connection state of one push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    /// Whether the subscription is open or still trying to be.
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.pad(label)
    }
}

/// A live push subscription: the decoded event stream plus its handle.
#[derive(Debug)]
pub struct Subscription {
    pub events: mpsc::UnboundedReceiver<TaskEvent>,
    pub handle: SubscriptionHandle,
}

/// Owner's view of a subscription's connection.
///
/// Dropping the handle aborts the transport task behind it.
#[derive(Debug)]
pub struct SubscriptionHandle {
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn new(
        state: watch::Receiver<ConnectionState>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self { state, task }
    }

    /// Current state. A transport that went away without reporting is
    /// treated as closed.
    pub fn state(&self) -> ConnectionState {
        if self.state.has_changed().is_err() {
            return ConnectionState::Closed;
        }
        *self.state.borrow()
    }

    pub fn is_live(&self) -> bool {
        self.state().is_live()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
