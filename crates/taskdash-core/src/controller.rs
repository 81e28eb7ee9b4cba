//! Top-level session controller.
//!
//! `TaskClient` owns the gateway and both stores. It listens for gateway
//! events and, when any call comes back 401, drops the session, empties the
//! task list and sends the user back to the login entry point.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::api::{ApiClient, ApiEvent, GatewayConfig};
use crate::config::Config;
use crate::error::Result;
use crate::session::{
    Credentials, FileStorage, Registration, Session, SessionStorage, SessionStore,
};
use crate::tasks::{NewTask, Task, TaskStats, TaskStatus, TaskStore, TaskUpdate};

/// Where the user should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

pub struct TaskClient {
    api: ApiClient,
    session: SessionStore,
    tasks: TaskStore,
    events: broadcast::Receiver<ApiEvent>,
    route: Route,
}

impl TaskClient {
    /// Restores any persisted session and subscribes to gateway events.
    pub fn new(api: ApiClient, storage: Arc<dyn SessionStorage>, refetch_delay: Duration) -> Self {
        let events = api.subscribe();
        let session = SessionStore::restore(api.clone(), storage);
        let tasks = TaskStore::new(api.clone()).with_refetch_delay(refetch_delay);
        let route = if session.is_authenticated() {
            Route::Dashboard
        } else {
            Route::Login
        };

        Self {
            api,
            session,
            tasks,
            events,
            route,
        }
    }

    /// Builds a client backed by the session file under `TASKDASH_HOME`.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::at_default_path());
        let api = ApiClient::new(GatewayConfig::from_config(config)?, Arc::clone(&storage))?;
        Ok(Self::new(api, storage, config.refetch_delay()))
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// # Errors
    /// See [`SessionStore::login`].
    pub async fn login(&mut self, credentials: &Credentials) -> Result<Session> {
        let result = self.session.login(credentials).await.cloned();
        self.drain_events();
        if result.is_ok() {
            self.route = Route::Dashboard;
        }
        result
    }

    /// # Errors
    /// See [`SessionStore::register`].
    pub async fn register(&mut self, registration: &Registration) -> Result<String> {
        let result = self.session.register(registration).await;
        self.drain_events();
        result
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.tasks.clear();
        self.route = Route::Login;
    }

    /// Authentication check for protected operations. Any failure clears
    /// local state and routes to login.
    ///
    /// # Errors
    /// Returns `Auth` when there is no usable session.
    pub fn require_session(&mut self) -> Result<&Session> {
        if let Err(err) = self.session.require_session() {
            self.tasks.clear();
            self.route = Route::Login;
            return Err(err);
        }
        self.route = Route::Dashboard;
        self.session.require_session()
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// # Errors
    /// See [`TaskStore::fetch_tasks`].
    pub async fn fetch_tasks(&mut self) -> Result<&[Task]> {
        let result = self.tasks.fetch_tasks().await.map(|_| ());
        self.drain_events();
        result.map(|()| self.tasks.tasks())
    }

    /// # Errors
    /// See [`TaskStore::fetch_task`].
    pub async fn fetch_task(&mut self, id: &str) -> Result<Task> {
        let result = self.tasks.fetch_task(id).await;
        self.drain_events();
        result
    }

    /// # Errors
    /// See [`TaskStore::create_task`].
    pub async fn create_task(&mut self, task: NewTask) -> Result<Task> {
        let result = self.tasks.create_task(task).await;
        self.drain_events();
        result
    }

    /// # Errors
    /// See [`TaskStore::update_task`].
    pub async fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Task> {
        let result = self.tasks.update_task(id, update).await;
        self.drain_events();
        result
    }

    /// # Errors
    /// See [`TaskStore::delete_task`].
    pub async fn delete_task(&mut self, id: &str) -> Result<()> {
        let result = self.tasks.delete_task(id).await;
        self.drain_events();
        result
    }

    /// # Errors
    /// See [`TaskStore::complete_task`].
    pub async fn complete_task(&mut self, id: &str) -> Result<Task> {
        let result = self.tasks.complete_task(id).await;
        self.drain_events();
        result
    }

    /// # Errors
    /// See [`TaskStore::toggle_task_status`].
    pub async fn toggle_task_status(&mut self, id: &str) -> Result<Task> {
        let result = self.tasks.toggle_task_status(id).await;
        self.drain_events();
        result
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks.tasks_by_status(status)
    }

    pub fn stats(&self) -> TaskStats {
        self.tasks.stats()
    }

    /// Applies pending gateway events. Returns true if the session was
    /// dropped.
    pub fn drain_events(&mut self) -> bool {
        let mut unauthorized = false;
        loop {
            match self.events.try_recv() {
                Ok(ApiEvent::Unauthorized { path }) => {
                    tracing::info!(path = %path, "session rejected by server");
                    unauthorized = true;
                }
                // Only one kind of event exists, so a missed one was a 401.
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "missed gateway events");
                    unauthorized = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if unauthorized {
            self.session.purge();
            self.tasks.clear();
            self.route = Route::Login;
        }
        unauthorized
    }
}
