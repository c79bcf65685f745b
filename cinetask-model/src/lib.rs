//! Core data model definitions shared across cinetask crates.
#![allow(missing_docs)]

pub mod collection;
pub mod error;
pub mod events;
pub mod ids;
pub mod task;

pub use collection::TaskCollection;
pub use error::{ModelError, Result as ModelResult};
pub use events::{LIFECYCLE_EVENT_TYPES, TaskEvent};
pub use ids::{MediaKey, TaskId};
pub use task::{DOWNLOAD_TASK_TYPE, Task, TaskStatus};
