//! Task Store.
//!
//! Holds the local task list. Every mutation is applied locally once the
//! server accepts it (deletes are applied before and rolled back on
//! failure), then the whole list is re-fetched so the local copy converges
//! to the server's. A failed call leaves the list as it was before the call.

use std::time::Duration;

use super::model::{NewTask, Task, TaskId, TaskStats, TaskStatus, TaskUpdate};
use crate::api::ApiClient;
use crate::error::{Error, Result};

const FETCH_FALLBACK: &str = "Failed to fetch tasks";
const CREATE_FALLBACK: &str = "Failed to create task";
const UPDATE_FALLBACK: &str = "Failed to update task";
const DELETE_FALLBACK: &str = "Failed to delete task";

pub struct TaskStore {
    api: ApiClient,
    tasks: Vec<Task>,
    loading: bool,
    error: Option<String>,
    refetch_delay: Duration,
}

impl TaskStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            loading: false,
            error: None,
            refetch_delay: Duration::ZERO,
        }
    }

    /// Pause between a mutation's response and its reconciling re-fetch.
    #[must_use]
    pub fn with_refetch_delay(mut self, delay: Duration) -> Self {
        self.refetch_delay = delay;
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failure, cleared by the next successful fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ------------------------------------------------------------------
    // Remote operations
    // ------------------------------------------------------------------

    /// Replaces the local list with the server's. A 404 is an empty list.
    ///
    /// # Errors
    /// Returns a network error; the local list is left untouched.
    pub async fn fetch_tasks(&mut self) -> Result<&[Task]> {
        self.loading = true;
        let result = self.api.list_tasks().await;
        self.loading = false;

        match result {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "fetched tasks");
                self.tasks = tasks;
                self.error = None;
                Ok(&self.tasks)
            }
            Err(err) => Err(self.fail(err.or_fallback(FETCH_FALLBACK))),
        }
    }

    /// Alias for [`TaskStore::fetch_tasks`].
    ///
    /// # Errors
    /// See [`TaskStore::fetch_tasks`].
    pub async fn refresh(&mut self) -> Result<&[Task]> {
        self.fetch_tasks().await
    }

    /// Reads one task from the server without touching the local list.
    ///
    /// # Errors
    /// Returns a validation error for a placeholder id, otherwise a network
    /// error.
    pub async fn fetch_task(&mut self, id: &str) -> Result<Task> {
        let id = self.parse_id(id)?;
        self.api
            .get_task(&id)
            .await
            .map_err(|err| self.fail(err.or_fallback("Failed to fetch task")))
    }

    /// Creates a task, adds it locally, then reconciles with the server.
    ///
    /// The returned task may carry a temporary id when the server did not
    /// report one; the reconciling fetch replaces it in the local list.
    ///
    /// # Errors
    /// Returns a validation error for empty details, otherwise a network
    /// error.
    pub async fn create_task(&mut self, task: NewTask) -> Result<Task> {
        if task.task_details.trim().is_empty() {
            return Err(self.fail(Error::validation("Task details are required")));
        }

        let created = match self.api.create_task(&task).await {
            Ok(created) => created,
            Err(err) => return Err(self.fail(err.or_fallback(CREATE_FALLBACK))),
        };
        tracing::info!(
            id = %created.id,
            temporary = created.id.is_temporary(),
            "task created"
        );

        self.tasks.push(created.clone());
        self.reconcile().await;
        Ok(created)
    }

    /// Sends a partial update, merges the server's answer into the local
    /// record, then reconciles.
    ///
    /// # Errors
    /// Returns a validation error for a placeholder id or an empty update
    /// (no request is sent), otherwise a network error.
    pub async fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Task> {
        let id = self.parse_id(id)?;
        if update.is_empty() {
            return Err(self.fail(Error::validation("Nothing to update")));
        }

        let updated = match self.api.update_task(&id, &update).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.fail(err.or_fallback(UPDATE_FALLBACK))),
        };
        tracing::info!(id = %updated.id, "task updated");

        let merged = match self.tasks.iter_mut().find(|t| t.id == updated.id) {
            Some(task) => {
                task.apply(&update);
                task.apply(&updated.changes);
                task.clone()
            }
            None => {
                tracing::debug!(id = %updated.id, "updated task not in local list");
                let mut task = Task {
                    id: updated.id,
                    task_details: String::new(),
                    task_status: TaskStatus::default(),
                };
                task.apply(&update);
                task.apply(&updated.changes);
                task
            }
        };

        self.reconcile().await;
        Ok(merged)
    }

    /// Removes a task locally, deletes it remotely, then reconciles. The
    /// local record is restored if the server call fails.
    ///
    /// # Errors
    /// Returns a validation error for a placeholder id, otherwise a network
    /// error.
    pub async fn delete_task(&mut self, id: &str) -> Result<()> {
        let id = self.parse_id(id)?;

        let removed = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .map(|index| (index, self.tasks.remove(index)));

        if let Err(err) = self.api.delete_task(&id).await {
            if let Some((index, task)) = removed {
                self.tasks.insert(index.min(self.tasks.len()), task);
            }
            return Err(self.fail(err.or_fallback(DELETE_FALLBACK)));
        }
        tracing::info!(id = %id, "task deleted");

        self.reconcile().await;
        Ok(())
    }

    /// Marks a local task as completed.
    ///
    /// # Errors
    /// `TaskNotFound` if the task is not in the local list, otherwise as
    /// [`TaskStore::update_task`].
    pub async fn complete_task(&mut self, id: &str) -> Result<Task> {
        self.set_status(id, |_| TaskStatus::Completed).await
    }

    /// Flips a local task between completed and pending.
    ///
    /// # Errors
    /// `TaskNotFound` if the task is not in the local list, otherwise as
    /// [`TaskStore::update_task`].
    pub async fn toggle_task_status(&mut self, id: &str) -> Result<Task> {
        self.set_status(id, TaskStatus::toggled).await
    }

    async fn set_status(
        &mut self,
        id: &str,
        next: impl FnOnce(TaskStatus) -> TaskStatus,
    ) -> Result<Task> {
        let id = self.parse_id(id)?;
        let Some(current) = self.task(id.as_str()).cloned() else {
            return Err(self.fail(Error::TaskNotFound(id)));
        };

        // The server expects the full record on update.
        let update = TaskUpdate {
            task_details: Some(current.task_details),
            task_status: Some(next(current.task_status)),
        };
        self.update_task(id.as_str(), update).await
    }

    // ------------------------------------------------------------------
    // Local queries
    // ------------------------------------------------------------------

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id.as_str() == id)
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.task_status == status)
            .collect()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// Empties the local list without contacting the server.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.error = None;
        self.loading = false;
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn parse_id(&mut self, raw: &str) -> Result<TaskId> {
        TaskId::parse(raw).map_err(|err| self.fail(err))
    }

    /// Re-fetches after a successful mutation. A failure here is recorded
    /// but does not fail the mutation that already succeeded.
    async fn reconcile(&mut self) {
        if !self.refetch_delay.is_zero() {
            tokio::time::sleep(self.refetch_delay).await;
        }
        if let Err(err) = self.fetch_tasks().await {
            tracing::warn!(error = %err, "re-fetch after mutation failed");
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        tracing::warn!(kind = %err.kind(), error = %err, "task operation failed");
        self.error = Some(err.to_string());
        err
    }
}
