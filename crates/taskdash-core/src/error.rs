//! Error taxonomy shared by the stores and the API gateway.
//!
//! Validation errors are raised before any network call. Auth errors cover
//! missing or invalid tokens and malformed session data. Network errors cover
//! transport failures and non-2xx responses; their message is already the
//! human-readable one (server payload first, generic fallback otherwise).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tasks::TaskId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Missing required input, caught before the network layer.
    #[error("{0}")]
    Validation(String),

    /// Missing/invalid token or malformed session data.
    #[error("{0}")]
    Auth(String),

    /// Transport failure or non-2xx HTTP response.
    #[error("{message}")]
    Network {
        status: Option<u16>,
        message: String,
        /// Raw response body, when there was one.
        details: Option<String>,
    },

    /// The task is not present in the local list.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Durable session storage could not be written.
    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Error category for callers that branch without inspecting payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    Network,
    NotFound,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Auth => write!(f, "auth"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a network error without an HTTP status (transport failure).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
            details: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Network { .. } => ErrorKind::Network,
            Error::TaskNotFound(_) => ErrorKind::NotFound,
            Error::Storage(_) => ErrorKind::Storage,
        }
    }

    /// HTTP status of a network error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Network { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Replaces the message of a network error that carried no server-provided
    /// text with an operation-specific fallback.
    #[must_use]
    pub fn or_fallback(self, fallback: &str) -> Self {
        match self {
            Error::Network {
                status,
                message,
                details,
            } if message.is_empty() => Error::Network {
                status,
                message: fallback.to_string(),
                details,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_only_replaces_empty_network_message() {
        let err = Error::Network {
            status: Some(500),
            message: String::new(),
            details: None,
        }
        .or_fallback("Failed to create task");
        assert_eq!(err.to_string(), "Failed to create task");
        assert_eq!(err.status(), Some(500));

        let err = Error::Network {
            status: Some(400),
            message: "Details too long".to_string(),
            details: None,
        }
        .or_fallback("Failed to create task");
        assert_eq!(err.to_string(), "Details too long");

        let err = Error::validation("Task details are required").or_fallback("ignored");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_display_is_snake_case() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(
            Error::TaskNotFound(TaskId::from("7")).kind(),
            ErrorKind::NotFound
        );
    }
}
