//! HTTP gateway for the TodoTask REST API.
//!
//! Attaches the persisted bearer token to every request, turns non-2xx
//! responses into `Error::Network` with the server's message, and publishes
//! `ApiEvent::Unauthorized` whenever any call gets a 401. The gateway never
//! touches session state itself; subscribers decide what a 401 means.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use url::Url;

use super::normalize;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::storage::{SessionStorage, TOKEN_KEY};
use crate::session::{Credentials, Registration};
use crate::tasks::{NewTask, Task, TaskId, TaskUpdate};

/// Standard User-Agent header for taskdash API requests.
pub const USER_AGENT: &str = concat!("taskdash/", env!("CARGO_PKG_VERSION"));

const EVENT_CAPACITY: usize = 16;

/// Side effects the gateway reports to whoever is listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiEvent {
    /// A request was rejected with 401; the session is no longer usable.
    Unauthorized { path: String },
}

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL without a trailing slash, e.g. `https://localhost:7011/api`.
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Some(Duration::from_secs(10)),
            accept_invalid_certs: false,
        }
    }

    /// Builds gateway settings from the loaded config (env overrides applied).
    ///
    /// # Errors
    /// Returns an error if the resolved base URL is invalid.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: config.effective_base_url()?,
            timeout: config.request_timeout(),
            accept_invalid_certs: config.api.accept_invalid_certs,
        })
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` when empty, a JSON string when not JSON.
    pub body: Value,
}

/// Result of an update call: the identifier the server answered for and the
/// fields it reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedTask {
    pub id: TaskId,
    pub changes: TaskUpdate,
}

/// Thin HTTP client over the auth and task endpoints.
#[derive(Clone)]
pub struct ApiClient {
    config: GatewayConfig,
    http: reqwest::Client,
    storage: Arc<dyn SessionStorage>,
    events: broadcast::Sender<ApiEvent>,
}

impl ApiClient {
    /// Creates a gateway that reads the bearer token from `storage`.
    ///
    /// # Errors
    /// Returns a network error if the HTTP client cannot be built (TLS
    /// backend initialization).
    pub fn new(config: GatewayConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {e}")))?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            config,
            http,
            storage,
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Subscribes to gateway side effects.
    pub fn subscribe(&self) -> broadcast::Receiver<ApiEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// `POST /auth/login`
    ///
    /// # Errors
    /// Returns a network error for transport failures and non-2xx responses.
    pub async fn login(&self, credentials: &Credentials) -> Result<ApiResponse> {
        self.send(Method::POST, "/auth/login", Some(credentials)).await
    }

    /// `POST /auth/register`
    ///
    /// # Errors
    /// Returns a network error for transport failures and non-2xx responses.
    pub async fn register(&self, registration: &Registration) -> Result<ApiResponse> {
        self.send(Method::POST, "/auth/register", Some(registration))
            .await
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// `GET /TodoTask/Get`. A 404 means the user has no tasks yet.
    ///
    /// # Errors
    /// Returns a network error for transport failures and non-2xx responses
    /// other than 404.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        match self.send(Method::GET, "/TodoTask/Get", None::<&()>).await {
            Ok(response) => Ok(normalize::normalize_task_list(response.body)),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND.as_u16()) => {
                tracing::debug!("task list returned 404, treating as empty");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// `GET /TodoTask/Get/{id}`
    ///
    /// # Errors
    /// Returns a network error for transport failures and non-2xx responses.
    pub async fn get_task(&self, id: &TaskId) -> Result<Task> {
        let response = self
            .send(Method::GET, &task_path("Get", id)?, None::<&()>)
            .await?;
        let body = normalize::unwrap_data(response.body);
        normalize::normalize_task(&body, Some(id))
            .ok_or_else(|| Error::transport("Server returned an unreadable task"))
    }

    /// `POST /TodoTask/Create`
    ///
    /// Missing response fields are reconstructed from the request; a missing
    /// identifier becomes a temporary one that the next list fetch replaces.
    ///
    /// # Errors
    /// Returns a validation error for empty details (before any request) and
    /// a network error for transport failures and non-2xx responses.
    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        if task.task_details.trim().is_empty() {
            return Err(Error::validation("Task details are required"));
        }

        let response = self
            .send(Method::POST, "/TodoTask/Create", Some(task))
            .await?;
        let body = normalize::unwrap_data(response.body);

        let id = normalize::task_id(&body).unwrap_or_else(|| {
            let temp = TaskId::temporary();
            tracing::debug!(id = %temp, "create response has no identifier, using temporary id");
            temp
        });
        let mut created = normalize::normalize_task(&body, Some(&id)).unwrap_or(Task {
            id,
            task_details: String::new(),
            task_status: task.task_status,
        });
        if normalize::task_details(&body).is_none() {
            created.task_details.clone_from(&task.task_details);
            if normalize::task_status(&body).is_none() {
                created.task_status = task.task_status;
            }
        }

        Ok(created)
    }

    /// `PUT /TodoTask/Update/{id}`
    ///
    /// # Errors
    /// Returns a network error for transport failures and non-2xx responses.
    pub async fn update_task(&self, id: &TaskId, update: &TaskUpdate) -> Result<UpdatedTask> {
        let response = self
            .send(Method::PUT, &task_path("Update", id)?, Some(update))
            .await?;
        let body = normalize::unwrap_data(response.body);

        let changes = TaskUpdate {
            task_details: normalize::task_details(&body),
            task_status: normalize::task_status(&body),
        };

        Ok(UpdatedTask {
            id: normalize::task_id(&body).unwrap_or_else(|| id.clone()),
            changes,
        })
    }

    /// `DELETE /TodoTask/Delete/{id}`
    ///
    /// # Errors
    /// Returns a network error for transport failures and non-2xx responses.
    pub async fn delete_task(&self, id: &TaskId) -> Result<()> {
        self.send(Method::DELETE, &task_path("Delete", id)?, None::<&()>)
            .await?;
        Ok(())
    }

    /// `GET /health`; true only for a 200.
    pub async fn health_check(&self) -> bool {
        match self.send(Method::GET, "/health", None::<&()>).await {
            Ok(response) => response.status == StatusCode::OK.as_u16(),
            Err(err) => {
                tracing::debug!(error = %err, "health check failed");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    fn bearer_token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(err) => {
                tracing::warn!(error = %err, "could not read token, sending request without it");
                None
            }
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse> {
        let url = format!("{}{}", self.config.base_url, path);
        let token = self.bearer_token();

        tracing::debug!(
            method = %method,
            path,
            has_token = token.is_some(),
            "api request"
        );

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header("content-type", "application/json")
            .header("accept", "application/json");
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(method = %method, path, error = %e, "api request failed");
            classify_reqwest_error(&e)
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let body = parse_body(&text);

        tracing::debug!(method = %method, path, status = status.as_u16(), "api response");

        if status == StatusCode::UNAUTHORIZED {
            tracing::info!(path, "unauthorized response, notifying session listeners");
            // No receivers is fine: nobody is tracking a session.
            let _ = self.events.send(ApiEvent::Unauthorized {
                path: path.to_string(),
            });
        }

        if !status.is_success() {
            return Err(Error::Network {
                status: Some(status.as_u16()),
                message: normalize::error_message(&body).unwrap_or_default(),
                details: (!text.is_empty()).then_some(text),
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// `/TodoTask/{action}/{id}` with the id encoded as a single path segment.
fn task_path(action: &str, id: &TaskId) -> Result<String> {
    let mut url = Url::parse("http://localhost/TodoTask")
        .map_err(|e| Error::transport(format!("Invalid task URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| Error::transport("Invalid task URL"))?
        .push(action)
        .push(id.as_str());
    Ok(url.path().to_string())
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn classify_reqwest_error(e: &reqwest::Error) -> Error {
    let message = if e.is_timeout() {
        format!("Request timed out: {e}")
    } else if e.is_connect() {
        format!("Connection failed: {e}")
    } else if e.is_request() {
        format!("Request error: {e}")
    } else {
        format!("Network error: {e}")
    };
    Error::transport(message)
}
