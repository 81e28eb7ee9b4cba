//! Task records as the rest of the crate sees them.
//!
//! These are canonical shapes only; turning loosely-shaped server JSON into
//! them happens once, in `api::normalize`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Prefix of identifiers assigned locally before the server confirms a task.
const TEMP_ID_PREFIX: &str = "temp-";

/// Values that stand in for "no identifier" and must never reach the network.
const PLACEHOLDER_IDS: &[&str] = &["undefined", "null"];

/// Canonical task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Parses a caller-supplied identifier, rejecting empty and placeholder
    /// values. Locally assigned temporary ids are placeholders too: the
    /// server has never seen them.
    ///
    /// # Errors
    /// Returns a validation error for empty, placeholder or temporary
    /// identifiers.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || PLACEHOLDER_IDS.contains(&trimmed) {
            return Err(Error::validation("Invalid task ID"));
        }
        if trimmed.starts_with(TEMP_ID_PREFIX) {
            return Err(Error::validation(
                "Task is not saved yet; refresh the list and try again",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// A locally-unique identifier for a task the server has not named yet.
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Task progress as exchanged with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Lenient parse for server data: unknown or missing values are pending.
    pub fn from_server(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    /// Status after a toggle: completed goes back to pending, anything else
    /// becomes completed.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Completed => TaskStatus::Pending,
            TaskStatus::Pending | TaskStatus::InProgress => TaskStatus::Completed,
        }
    }

    pub fn all() -> &'static [TaskStatus] {
        &[
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
        ]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TaskStatus::all()
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                Error::validation(format!(
                    "Unknown task status '{wanted}' (expected pending, in-progress or completed)"
                ))
            })
    }
}

/// A task record keyed by its canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub task_details: String,
    pub task_status: TaskStatus,
}

impl Task {
    /// Overlays the fields present in `update`.
    pub fn apply(&mut self, update: &TaskUpdate) {
        if let Some(details) = &update.task_details {
            self.task_details.clone_from(details);
        }
        if let Some(status) = update.task_status {
            self.task_status = status;
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub task_details: String,
    pub task_status: TaskStatus,
}

impl NewTask {
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            task_details: details.into(),
            task_status: TaskStatus::Pending,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task_status = status;
        self
    }
}

/// Body of a partial update request; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.task_details.is_none() && self.task_status.is_none()
    }
}

/// Counts per status over the local list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub in_progress: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(
            TaskStats {
                total: tasks.len(),
                ..TaskStats::default()
            },
            |mut stats, task| {
                match task.task_status {
                    TaskStatus::Pending => stats.pending += 1,
                    TaskStatus::InProgress => stats.in_progress += 1,
                    TaskStatus::Completed => stats.completed += 1,
                }
                stats
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_placeholder_ids() {
        for raw in ["", "   ", "undefined", "null"] {
            let err = TaskId::parse(raw).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "raw {raw:?}");
        }
        assert_eq!(TaskId::parse(" 12 ").unwrap().as_str(), "12");
    }

    #[test]
    fn test_temporary_ids_are_marked_and_unique() {
        let a = TaskId::temporary();
        let b = TaskId::temporary();
        assert!(a.is_temporary());
        assert_ne!(a, b);
        assert!(!TaskId::from("42").is_temporary());

        let err = TaskId::parse(a.as_str()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_status_parsing_is_case_insensitive_and_lenient_for_server() {
        assert_eq!("In-Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!(TaskStatus::from_server(Some("COMPLETED")), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_server(Some("archived")), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_server(None), TaskStatus::Pending);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(TaskStatus::Completed.toggled(), TaskStatus::Pending);
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Completed);
        assert_eq!(TaskStatus::InProgress.toggled(), TaskStatus::Completed);
    }

    #[test]
    fn test_wire_format_uses_camel_case_and_kebab_status() {
        let body = serde_json::to_value(NewTask::new("Buy milk").with_status(TaskStatus::InProgress))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"taskDetails": "Buy milk", "taskStatus": "in-progress"})
        );

        let patch = TaskUpdate {
            task_status: Some(TaskStatus::Completed),
            ..TaskUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(patch).unwrap(),
            serde_json::json!({"taskStatus": "completed"})
        );
    }

    #[test]
    fn test_stats_count_each_status() {
        let task = |id: &str, status| Task {
            id: TaskId::from(id),
            task_details: String::new(),
            task_status: status,
        };
        let stats = TaskStats::from_tasks(&[
            task("1", TaskStatus::Pending),
            task("2", TaskStatus::Completed),
            task("3", TaskStatus::Completed),
            task("4", TaskStatus::InProgress),
        ]);
        assert_eq!(
            stats,
            TaskStats {
                total: 4,
                completed: 2,
                pending: 1,
                in_progress: 1,
            }
        );
    }
}
