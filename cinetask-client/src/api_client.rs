use async_trait::async_trait;
use cinetask_model::Task;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::TaskSource;

/// HTTP client for the task API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    tasks_url: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("tasks_url", &self.tasks_url)
            .field("has_token", &self.access_token.is_some())
            .finish()
    }
}

/// Bulk listing as served: either a bare array or wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskListResponse {
    Bare(Vec<Task>),
    Envelope { data: Vec<Task> },
}

impl TaskListResponse {
    fn into_tasks(self) -> Vec<Task> {
        match self {
            TaskListResponse::Bare(tasks) => tasks,
            TaskListResponse::Envelope { data } => data,
        }
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let tasks_url = config.tasks_url();

        info!("[ApiClient] Task listing at {}", tasks_url);

        Ok(Self {
            client,
            tasks_url,
            access_token: config.access_token.clone(),
        })
    }

    pub fn tasks_url(&self) -> &str {
        &self.tasks_url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }
}

#[async_trait]
impl TaskSource for ApiClient {
    async fn fetch_tasks(&self) -> ClientResult<Vec<Task>> {
        let mut request = self.client.get(&self.tasks_url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let listing: TaskListResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        let tasks = listing.into_tasks();

        debug!("[ApiClient] Fetched {} tasks", tasks.len());
        Ok(tasks)
    }
}
