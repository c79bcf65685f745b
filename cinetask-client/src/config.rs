use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{ClientError, ClientResult};

pub const ENV_SERVER_URL: &str = "CINETASK_SERVER_URL";
pub const ENV_EVENTS_URL: &str = "CINETASK_EVENTS_URL";
pub const ENV_TOKEN: &str = "CINETASK_TOKEN";

const CONFIG_DIR_NAME: &str = "cinetask";
const CONFIG_FILE_NAME: &str = "config.json";

/// Connection settings for the task API and its push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    /// Push channel endpoint. Derived from `server_url` when unset.
    pub events_url: Option<String>,
    pub tasks_path: String,
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub reconnect: ReconnectPolicy,
}

/// Backoff applied by the WebSocket transport between connection attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts tolerated before the subscription closes.
    pub max_retries: u32,
    pub max_backoff_secs: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            max_backoff_secs: 30,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (1-based retry count).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = 2u64.saturating_pow(attempt - 1);
        Duration::from_secs(exp.min(self.max_backoff_secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            events_url: None,
            tasks_path: "/api/tasks".to_string(),
            access_token: None,
            request_timeout_secs: 30,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Default location of the config file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Defaults, then the default config file, then the environment.
    pub fn load() -> Self {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => {
                Self::from_file(&path).unwrap_or_else(|err| {
                    log::warn!(
                        "Ignoring unreadable config at {}: {}",
                        path.display(),
                        err
                    );
                    Self::default()
                })
            }
            _ => Self::default(),
        };
        config.apply_env();
        config
    }

    /// Like [`ClientConfig::load`] but with an explicit file that must exist.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            ClientError::Config(format!("{}: {}", path.display(), e))
        })
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overrides fields from a variable lookup; empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(server_url) = get(ENV_SERVER_URL) {
            self.server_url = server_url;
        }
        if let Some(events_url) = get(ENV_EVENTS_URL) {
            self.events_url = Some(events_url);
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.access_token = Some(token);
        }
    }

    pub fn save(&self, path: &Path) -> ClientResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ClientError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn base_url(&self) -> String {
        normalize_base_url(&self.server_url)
    }

    /// Full URL of the bulk task listing.
    pub fn tasks_url(&self) -> String {
        let path = self.tasks_path.trim_start_matches('/');
        format!("{}/{}", self.base_url(), path)
    }

    /// Push channel URL: explicit `events_url`, or the server URL with a
    /// `ws`/`wss` scheme and a `/ws` path.
    pub fn events_url(&self) -> ClientResult<Url> {
        if let Some(explicit) = &self.events_url {
            return Url::parse(explicit)
                .map_err(|e| ClientError::InvalidUrl(format!("{explicit}: {e}")));
        }

        let base = self.base_url();
        let mut url = Url::parse(&base)
            .map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::InvalidUrl(base.clone()))?;
        let path = format!("{}/ws", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url)
    }
}

/// Adds `http://` when the scheme is missing and trims trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
