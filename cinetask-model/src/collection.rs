use std::collections::HashMap;

use crate::ids::{MediaKey, TaskId};
use crate::task::Task;

/// Authoritative set of tasks, keyed by [`TaskId`].
///
/// Holds at most one entry per id. Installation order is remembered so that
/// scans (and therefore "first match" lookups) are deterministic; patches
/// never reorder entries or change membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCollection {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from a bulk response.
    ///
    /// A repeated id replaces the earlier entry in place.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut collection = Self::new();
        for task in tasks {
            match collection.index.get(&task.id) {
                Some(&slot) => collection.tasks[slot] = task,
                None => {
                    let slot = collection.tasks.len();
                    collection.index.insert(task.id.clone(), slot);
                    collection.tasks.push(task);
                }
            }
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&slot| &self.tasks[slot])
    }

    /// Replaces the progress of one task, leaving every other field alone.
    ///
    /// Returns `false` when the id is not present.
    pub fn set_progress(
        &mut self,
        id: &str,
        progress: serde_json::Value,
    ) -> bool {
        match self.index.get(id) {
            Some(&slot) => {
                self.tasks[slot].progress = progress;
                true
            }
            None => false,
        }
    }

    /// First task, in installation order, that is running and whose payload
    /// carries `media`.
    pub fn find_running_by_media(&self, media: &MediaKey) -> Option<&Task> {
        self.tasks.iter().find(|task| {
            task.status.is_running() && task.media_key().as_ref() == Some(media)
        })
    }

    /// Tasks in installation order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &TaskId> {
        self.tasks.iter().map(|task| &task.id)
    }
}

impl FromIterator<Task> for TaskCollection {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self::from_tasks(iter)
    }
}
