use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Server-assigned task identifier. Opaque; stable for the task's lifetime.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TaskId {
    /// Reads a task id out of an arbitrary JSON value.
    ///
    /// Numeric ids keep their textual form; anything else is `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        json_key_text(value).map(TaskId)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        TaskId(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        TaskId(id)
    }
}

/// Secondary identity of a download: the media item it fetches.
///
/// Backends emit `media_id` either as a JSON string or as a number, so the
/// key keeps the textual form and compares on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MediaKey(String);

impl MediaKey {
    pub fn new(key: impl Into<String>) -> Self {
        MediaKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads a media key out of an arbitrary JSON value.
    ///
    /// Returns `None` for anything that is not a string or a number.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        json_key_text(value).map(MediaKey)
    }
}

/// Textual form of a string or numeric JSON key.
///
/// Integral floats are written without a fraction so `42.0` and `42` agree.
fn json_key_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => {
            if n.is_f64()
                && let Some(f) = n.as_f64()
                && f.fract() == 0.0
                && f.abs() < 9.0e15
            {
                return Some(format!("{}", f as i64));
            }
            Some(n.to_string())
        }
        _ => None,
    }
}

/// Deserializers for ids inside push events, where a malformed id must not
/// sink the whole event.
pub(crate) mod lenient {
    use super::{MediaKey, TaskId};
    use serde::{Deserialize, Deserializer};

    /// Any value that is not a string or number reads as `None`.
    pub fn task_id<'de, D>(deserializer: D) -> Result<Option<TaskId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(TaskId::from_json(&value))
    }

    pub fn media_key<'de, D>(
        deserializer: D,
    ) -> Result<Option<MediaKey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(MediaKey::from_json(&value))
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for MediaKey {
    fn from(key: &str) -> Self {
        MediaKey(key.to_string())
    }
}

impl<'de> Deserialize<'de> for MediaKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        MediaKey::from_json(&value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "media_id must be a string or number, got {value}"
            ))
        })
    }
}
