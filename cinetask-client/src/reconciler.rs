//! Maps one push event onto a cache decision.
//!
//! Progress events patch a single task in place. Lifecycle events ask for a
//! full resynchronization. Everything else is ignored.

use cinetask_model::{MediaKey, Task, TaskCollection, TaskEvent, TaskId};

/// What the store should do with one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Replace the `progress` of `target`; nothing else changes.
    Patch {
        target: TaskId,
        progress: serde_json::Value,
    },
    /// Discard incremental state and re-run the bulk fetch.
    Resync,
    Ignore(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Progress for a task that is not (or no longer) in the cache.
    Unresolved,
    /// Event type this client does not act on.
    Unrecognized,
}

/// Decides how `event` applies to `tasks`. Never fails.
pub fn reconcile(tasks: &TaskCollection, event: &TaskEvent) -> Reconciliation {
    match event {
        TaskEvent::DownloadProgress {
            task_id,
            media_id,
            progress,
        } => match resolve_target(tasks, task_id.as_ref(), media_id.as_ref()) {
            Some(task) => Reconciliation::Patch {
                target: task.id.clone(),
                progress: progress.clone(),
            },
            None => Reconciliation::Ignore(IgnoreReason::Unresolved),
        },
        TaskEvent::DownloadStarted { .. }
        | TaskEvent::DownloadCompleted { .. }
        | TaskEvent::DownloadFailed { .. } => Reconciliation::Resync,
        TaskEvent::Unknown => Reconciliation::Ignore(IgnoreReason::Unrecognized),
    }
}

/// Finds the task a progress event refers to.
///
/// An exact `task_id` hit wins. Failing that, the first running task (in
/// installation order) whose payload carries `media_id` is used. If several
/// running tasks share a media id the earliest installed one is picked.
pub fn resolve_target<'a>(
    tasks: &'a TaskCollection,
    task_id: Option<&TaskId>,
    media_id: Option<&MediaKey>,
) -> Option<&'a Task> {
    if let Some(task) = task_id.and_then(|id| tasks.get(id.as_str())) {
        return Some(task);
    }
    media_id.and_then(|media| tasks.find_running_by_media(media))
}

/// Applies a patch to the collection.
///
/// Returns `true` only when a task was actually modified.
pub fn apply_patch(
    tasks: &mut TaskCollection,
    reconciliation: &Reconciliation,
) -> bool {
    match reconciliation {
        Reconciliation::Patch { target, progress } => {
            tasks.set_progress(target.as_str(), progress.clone())
        }
        Reconciliation::Resync | Reconciliation::Ignore(_) => false,
    }
}
