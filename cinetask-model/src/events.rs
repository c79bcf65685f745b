use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::{MediaKey, TaskId, lenient};

/// Wire names of the coarse lifecycle events.
pub const LIFECYCLE_EVENT_TYPES: [&str; 3] =
    ["download_started", "download_completed", "download_failed"];

/// Server-pushed task event, discriminated by its `type` field.
///
/// Lifecycle variants keep whatever ids the server attached for logging, but
/// their bodies are never applied to the cache: they only signal that
/// membership or status changed. Ids that are neither strings nor numbers
/// decode as `None` instead of failing the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    DownloadProgress {
        #[serde(
            default,
            deserialize_with = "lenient::task_id",
            skip_serializing_if = "Option::is_none"
        )]
        task_id: Option<TaskId>,
        #[serde(
            default,
            deserialize_with = "lenient::media_key",
            skip_serializing_if = "Option::is_none"
        )]
        media_id: Option<MediaKey>,
        progress: serde_json::Value,
    },
    DownloadStarted {
        #[serde(
            default,
            deserialize_with = "lenient::task_id",
            skip_serializing_if = "Option::is_none"
        )]
        task_id: Option<TaskId>,
    },
    DownloadCompleted {
        #[serde(
            default,
            deserialize_with = "lenient::task_id",
            skip_serializing_if = "Option::is_none"
        )]
        task_id: Option<TaskId>,
    },
    DownloadFailed {
        #[serde(
            default,
            deserialize_with = "lenient::task_id",
            skip_serializing_if = "Option::is_none"
        )]
        task_id: Option<TaskId>,
    },
    #[serde(other)]
    Unknown,
}

impl TaskEvent {
    /// Decodes one text frame from the push channel.
    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn progress(
        task_id: Option<TaskId>,
        media_id: Option<MediaKey>,
        progress: serde_json::Value,
    ) -> Self {
        TaskEvent::DownloadProgress {
            task_id,
            media_id,
            progress,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::DownloadProgress { .. } => "download_progress",
            TaskEvent::DownloadStarted { .. } => LIFECYCLE_EVENT_TYPES[0],
            TaskEvent::DownloadCompleted { .. } => LIFECYCLE_EVENT_TYPES[1],
            TaskEvent::DownloadFailed { .. } => LIFECYCLE_EVENT_TYPES[2],
            TaskEvent::Unknown => "unknown",
        }
    }

    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            TaskEvent::DownloadStarted { .. }
                | TaskEvent::DownloadCompleted { .. }
                | TaskEvent::DownloadFailed { .. }
        )
    }
}
