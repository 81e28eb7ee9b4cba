//! Response normalization at the API boundary.
//!
//! The backend is inconsistent about field names (`id` vs `taskId` vs `Id`,
//! `token` vs `accessToken`, ...) and sometimes wraps payloads in `data`.
//! Every probe lives here; nothing past the gateway sees raw JSON.

use serde_json::{Map, Value};

use crate::session::UserProfile;
use crate::session::profile::scalar_to_string;
use crate::tasks::{Task, TaskId, TaskStatus};

/// Field names a bearer token may arrive under, in probe order.
const TOKEN_FIELDS: &[&str] = &["token", "accessToken", "authToken", "jwtToken", "access_token"];

/// Fields never kept on a persisted user.
const SENSITIVE_USER_FIELDS: &[&str] = &["passwordHash", "password"];

const USER_ID_PATHS: &[&[&str]] = &[&["userId"], &["id"], &["user", "id"], &["sub"]];
const USER_NAME_PATHS: &[&[&str]] = &[
    &["name"],
    &["userName"],
    &["user", "name"],
    &["fullName"],
    &["displayName"],
];
const USER_EMAIL_PATHS: &[&[&str]] = &[
    &["email"],
    &["userEmail"],
    &["user", "email"],
    &["emailAddress"],
];

/// Field names a task identifier may arrive under, in probe order.
const TASK_ID_FIELDS: &[&str] = &["id", "taskId", "Id", "TaskId", "_id"];
const TASK_DETAILS_FIELDS: &[&str] = &["taskDetails", "TaskDetails"];
const TASK_STATUS_FIELDS: &[&str] = &["taskStatus", "TaskStatus"];

/// Unwraps a `{ "data": {...} }` envelope; other values pass through.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(is_present) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Extracts the bearer token from a login response.
pub fn extract_token(body: &Value) -> Option<String> {
    TOKEN_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
}

/// Builds the canonical user from a login response.
///
/// Probed `id`/`name`/`email` come first, then the nested `user` object's
/// fields, then the root object's fields when the root itself carries a name
/// or email. Token and secret fields are dropped. If the result identifies
/// nobody (no email, no id) the whole body becomes the user.
pub fn extract_user(body: &Value) -> UserProfile {
    let mut user = Map::new();
    for (key, paths) in [
        ("id", USER_ID_PATHS),
        ("name", USER_NAME_PATHS),
        ("email", USER_EMAIL_PATHS),
    ] {
        if let Some(value) = probe_paths(body, paths) {
            user.insert(key.to_string(), value.clone());
        }
    }

    if let Some(Value::Object(nested)) = body.get("user") {
        user.extend(nested.clone());
    }

    let root_describes_user = ["name", "email"]
        .iter()
        .any(|field| body.get(*field).is_some_and(is_present));
    if root_describes_user && let Value::Object(root) = body {
        user.extend(root.clone());
    }

    strip_user_fields(&mut user);

    let identified = ["email", "id"]
        .iter()
        .any(|field| user.get(*field).is_some_and(is_present));
    if !identified && let Value::Object(root) = body {
        user = root.clone();
        strip_user_fields(&mut user);
    }

    UserProfile::from_map(user)
}

/// Finds a task identifier under any known field name.
pub fn task_id(value: &Value) -> Option<TaskId> {
    TASK_ID_FIELDS
        .iter()
        .find_map(|field| value.get(*field).and_then(scalar_to_string))
        .map(TaskId::from)
}

/// Normalizes one task record.
///
/// `fallback_id` is used when the record carries no identifier of its own.
/// Returns `None` when no identifier is available at all.
pub fn normalize_task(value: &Value, fallback_id: Option<&TaskId>) -> Option<Task> {
    let id = task_id(value).or_else(|| fallback_id.cloned())?;
    Some(Task {
        id,
        task_details: task_details(value).unwrap_or_default(),
        task_status: TaskStatus::from_server(first_str(value, TASK_STATUS_FIELDS)),
    })
}

/// Task details under any known field name, if non-empty.
pub fn task_details(value: &Value) -> Option<String> {
    first_str(value, TASK_DETAILS_FIELDS)
        .filter(|details| !details.is_empty())
        .map(ToString::to_string)
}

/// Status under any known field name. An unrecognized value reads as
/// pending; a missing field is `None`.
pub fn task_status(value: &Value) -> Option<TaskStatus> {
    first_str(value, TASK_STATUS_FIELDS).map(|raw| TaskStatus::from_server(Some(raw)))
}

/// Normalizes a task list response. Non-array bodies are an empty list;
/// records without any identifier are skipped.
pub fn normalize_task_list(body: Value) -> Vec<Task> {
    let Value::Array(items) = unwrap_data(body) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let task = normalize_task(item, None);
            if task.is_none() {
                tracing::warn!("skipping task record without an identifier");
            }
            task
        })
        .collect()
}

/// Human-readable message from an error payload.
///
/// Prefers a validation `errors` map (`field: m1, m2; ...`), then `message`,
/// then `title`.
pub fn error_message(body: &Value) -> Option<String> {
    if let Some(Value::Object(errors)) = body.get("errors")
        && !errors.is_empty()
    {
        let parts: Vec<String> = errors
            .iter()
            .map(|(field, messages)| format!("{field}: {}", join_messages(messages)))
            .collect();
        return Some(parts.join("; "));
    }

    ["message", "title"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToString::to_string)
}

fn join_messages(messages: &Value) -> String {
    match messages {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map_or_else(|| item.to_string(), ToString::to_string))
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn strip_user_fields(user: &mut Map<String, Value>) {
    for field in TOKEN_FIELDS.iter().chain(SENSITIVE_USER_FIELDS) {
        user.remove(*field);
    }
    user.remove("user");
}

fn probe_paths<'a>(body: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(body, |value, key| value.get(*key))
            .filter(|value| is_present(value))
    })
}

fn first_str<'a>(value: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
}

/// JavaScript-style truthiness for the handful of kinds the backend sends.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
