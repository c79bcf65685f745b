//! Live cache of server tasks with a published download view.
//!
//! The store seeds itself from one bulk fetch, keeps a single push
//! subscription open, and folds each pushed event in through the
//! [`reconciler`](crate::reconciler). Lifecycle events re-run the bulk fetch
//! rather than patching; overlapping fetches are not coalesced, so whichever
//! completes last is what the view shows.

use cinetask_model::{Task, TaskCollection, TaskEvent, TaskId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api_client::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::reconciler::{IgnoreReason, Reconciliation, apply_patch, reconcile};
use crate::transport::websocket::WebSocketTransport;
use crate::transport::{
    ConnectionState, PushTransport, Subscription, SubscriptionHandle,
    TaskSource,
};
use crate::view::DownloadView;

/// Result of feeding one event to the store.
#[derive(Debug)]
pub enum EventOutcome {
    /// Progress of this task was replaced.
    Patched(TaskId),
    /// A bulk fetch was spawned; awaiting the handle is optional.
    Resyncing(JoinHandle<()>),
    Dropped(IgnoreReason),
}

/// Shared handle to the task cache. Clones refer to the same cache.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    source: Arc<dyn TaskSource>,
    transport: Arc<dyn PushTransport>,
    tasks: Mutex<TaskCollection>,
    downloads: watch::Sender<DownloadView>,
    subscription: Mutex<Option<ActiveSubscription>>,
}

/// The subscription currently feeding the store and the task draining it.
struct ActiveSubscription {
    handle: SubscriptionHandle,
    pump: JoinHandle<()>,
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("source", &self.inner.source)
            .field("transport", &self.inner.transport)
            .field("tasks", &self.inner.tasks.lock().len())
            .field("connection", &self.connection_state())
            .finish()
    }
}

impl TaskStore {
    pub fn new(
        source: Arc<dyn TaskSource>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let (downloads, _) = watch::channel(DownloadView::default());
        Self {
            inner: Arc::new(StoreInner {
                source,
                transport,
                tasks: Mutex::new(TaskCollection::new()),
                downloads,
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Store backed by the HTTP task API and its WebSocket push channel.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let source = ApiClient::new(config)?;
        let transport = WebSocketTransport::from_config(config)?;
        Ok(Self::new(Arc::new(source), Arc::new(transport)))
    }

    /// Makes sure the push subscription is live, then seeds the cache.
    ///
    /// Safe to call repeatedly. A failed fetch is logged and leaves the
    /// cache as it was.
    pub async fn initialize(&self) {
        self.ensure_subscribed();

        match self.bulk_fetch().await {
            Ok(count) => log::info!("Task cache seeded with {count} tasks"),
            Err(err) => log::error!("Initial task fetch failed: {err}"),
        }
    }

    /// Opens a push subscription unless one is connecting or open.
    ///
    /// Returns `true` when a new subscription was started. A subscription
    /// that has closed is replaced.
    pub fn ensure_subscribed(&self) -> bool {
        let mut slot = self.inner.subscription.lock();
        if let Some(active) = slot.as_ref()
            && active.handle.is_live()
        {
            log::debug!(
                "Task events subscription already {}",
                active.handle.state()
            );
            return false;
        }

        let Subscription { events, handle } = self.inner.transport.subscribe();
        let pump = tokio::spawn(pump_events(Arc::downgrade(&self.inner), events));
        *slot = Some(ActiveSubscription { handle, pump });
        log::debug!("Task events subscription started");
        true
    }

    /// Replaces the whole cache with the server's current listing.
    ///
    /// All-or-nothing: on error the cache is untouched. Returns the number
    /// of tasks installed.
    pub async fn bulk_fetch(&self) -> ClientResult<usize> {
        let tasks = self.inner.source.fetch_tasks().await?;
        let collection = TaskCollection::from_tasks(tasks);
        let count = collection.len();
        self.install(collection);
        Ok(count)
    }

    /// Folds one pushed event into the cache.
    ///
    /// Must be called from within a tokio runtime; lifecycle events spawn
    /// the resync.
    pub fn handle_event(&self, event: TaskEvent) -> EventOutcome {
        let mut tasks = self.inner.tasks.lock();
        let decision = reconcile(&tasks, &event);

        match decision {
            Reconciliation::Patch { ref target, .. } => {
                let target = target.clone();
                apply_patch(&mut tasks, &decision);
                self.publish(&tasks);
                EventOutcome::Patched(target)
            }
            Reconciliation::Resync => {
                drop(tasks);
                log::debug!("{} received, resyncing tasks", event.event_type());
                EventOutcome::Resyncing(self.spawn_resync())
            }
            Reconciliation::Ignore(reason) => {
                log::trace!(
                    "Dropping {} event ({:?})",
                    event.event_type(),
                    reason
                );
                EventOutcome::Dropped(reason)
            }
        }
    }

    /// Current download view.
    pub fn downloads(&self) -> DownloadView {
        self.inner.downloads.borrow().clone()
    }

    /// Receiver that is notified each time the download view changes.
    pub fn watch_downloads(&self) -> watch::Receiver<DownloadView> {
        self.inner.downloads.subscribe()
    }

    /// Any cached task, downloads or not.
    pub fn task(&self, id: &str) -> Option<Task> {
        self.inner.tasks.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tasks.lock().is_empty()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner
            .subscription
            .lock()
            .as_ref()
            .map(|active| active.handle.state())
            .unwrap_or(ConnectionState::Closed)
    }

    fn install(&self, collection: TaskCollection) {
        let mut tasks = self.inner.tasks.lock();
        *tasks = collection;
        self.publish(&tasks);
    }

    fn publish(&self, tasks: &TaskCollection) {
        self.inner.downloads.send_replace(DownloadView::project(tasks));
    }

    fn spawn_resync(&self) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            if let Err(err) = store.bulk_fetch().await {
                log::warn!("Task resync failed, keeping cached tasks: {err}");
            }
        })
    }
}

async fn pump_events(
    inner: Weak<StoreInner>,
    mut events: mpsc::UnboundedReceiver<TaskEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        TaskStore { inner }.handle_event(event);
    }
    log::debug!("Task events stream ended");
}
