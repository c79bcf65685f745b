//! Live view of a media server's download tasks.
//!
//! [`TaskStore`] keeps an in-memory copy of the server's task list. It is
//! seeded by a bulk HTTP fetch, patched by progress events pushed over a
//! WebSocket, and resynchronized whenever a download starts, completes or
//! fails. Consumers read the newest-first [`DownloadView`] or watch it for
//! changes.
#![allow(missing_docs)]

pub mod api_client;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod store;
pub mod transport;
pub mod view;

pub use api_client::ApiClient;
pub use config::{ClientConfig, ReconnectPolicy};
pub use error::{ClientError, ClientResult};
pub use reconciler::{IgnoreReason, Reconciliation, reconcile};
pub use store::{EventOutcome, TaskStore};
pub use transport::websocket::WebSocketTransport;
pub use transport::{
    ConnectionState, PushTransport, Subscription, SubscriptionHandle,
    TaskSource,
};
pub use view::{DownloadSummary, DownloadView};

pub use cinetask_model as model;
