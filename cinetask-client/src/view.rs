use cinetask_model::{Task, TaskCollection, TaskStatus};
use std::cmp::Reverse;
use std::sync::Arc;

/// Read-only, newest-first listing of download tasks.
///
/// Cheap to clone; consumers never get at the collection it was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadView {
    tasks: Arc<[Task]>,
}

impl DownloadView {
    /// Projects `collection`: downloads only, sorted by `created_at`
    /// descending. Equal timestamps keep installation order.
    pub fn project(collection: &TaskCollection) -> Self {
        let mut downloads: Vec<Task> = collection
            .iter()
            .filter(|task| task.is_download())
            .cloned()
            .collect();
        downloads.sort_by_key(|task| Reverse(task.created_at_instant()));

        Self {
            tasks: downloads.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn summary(&self) -> DownloadSummary {
        let mut summary = DownloadSummary::default();
        for task in self.tasks.iter() {
            match task.status {
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Cancelled | TaskStatus::Other(_) => {
                    summary.other += 1
                }
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a DownloadView {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Per-status counts of the downloads in a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub running: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub other: usize,
}

impl DownloadSummary {
    pub fn total(&self) -> usize {
        self.running + self.pending + self.completed + self.failed + self.other
    }
}
