use std::fmt::{self, Display};

/// Errors produced while decoding or validating task data.
#[derive(Debug)]
pub enum ModelError {
    Decode(serde_json::Error),
    InvalidTask(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Decode(err) => write!(f, "decode error: {err}"),
            ModelError::InvalidTask(msg) => write!(f, "invalid task: {msg}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Decode(err) => Some(err),
            ModelError::InvalidTask(_) => None,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Decode(err)
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
