//! Session Store: login, registration, logout and restore.
//!
//! The persisted `token`/`user` pair is the source of truth across runs; the
//! in-memory `Session` mirrors it. Every path that finds the pair unusable
//! clears both keys so a half-written session never survives.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::profile::UserProfile;
use super::storage::{SessionStorage, TOKEN_KEY, USER_KEY, mask_token};
use super::token::{self, TokenClaims};
use crate::api::{ApiClient, normalize};
use crate::error::{Error, Result};

const LOGIN_FALLBACK: &str = "Login failed. Please try again.";
const REGISTER_FALLBACK: &str = "Registration failed";

/// Login request body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration request body.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An established session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn SessionStorage>,
    session: Option<Session>,
    error: Option<String>,
}

impl SessionStore {
    /// Restores the persisted session, if any.
    ///
    /// Absent, partial, or unparsable data resolves to logged-out and the
    /// leftovers are removed. Never fails.
    pub fn restore(api: ApiClient, storage: Arc<dyn SessionStorage>) -> Self {
        let mut store = Self {
            api,
            storage,
            session: None,
            error: None,
        };
        store.session = store.read_persisted();
        store
    }

    fn read_persisted(&self) -> Option<Session> {
        let token = self.storage.get(TOKEN_KEY);
        let user = self.storage.get(USER_KEY);

        let (token, user) = match (token, user) {
            (Ok(None), Ok(None)) => return None,
            (Ok(Some(token)), Ok(Some(user))) => (token, user),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(error = %err, "persisted session unreadable, clearing");
                self.clear_persisted();
                return None;
            }
            _ => {
                tracing::warn!("persisted session incomplete, clearing");
                self.clear_persisted();
                return None;
            }
        };

        if token.trim().is_empty() {
            tracing::warn!("persisted token is empty, clearing");
            self.clear_persisted();
            return None;
        }

        match serde_json::from_str::<Value>(&user) {
            Ok(Value::Object(map)) => {
                tracing::debug!(token = %mask_token(&token), "restored session");
                Some(Session {
                    token,
                    user: UserProfile::from_map(map),
                })
            }
            Ok(_) | Err(_) => {
                tracing::warn!("persisted user is not a JSON object, clearing");
                self.clear_persisted();
                None
            }
        }
    }

    /// Signs in and persists the session before returning.
    ///
    /// # Errors
    /// - `Validation` if email or password is empty (no request is sent).
    /// - `Auth` if the response has no token or is not an object.
    /// - `Network` for transport failures and rejected credentials.
    /// - `Storage` if the session could not be persisted.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<&Session> {
        self.error = None;
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(self.fail(Error::validation("Email and password are required")));
        }

        tracing::info!(email = %credentials.email, "logging in");
        let response = match self.api.login(credentials).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err.or_fallback(LOGIN_FALLBACK))),
        };

        let body = response.body;
        if !body.is_object() {
            return Err(self.fail(Error::auth("Invalid response structure from server")));
        }
        let Some(token) = normalize::extract_token(&body) else {
            return Err(self.fail(Error::auth(
                "No authentication token received from server",
            )));
        };
        let user = normalize::extract_user(&body);

        if let Err(err) = self.persist(&token, &user) {
            self.clear_persisted();
            return Err(self.fail(err));
        }

        tracing::info!(
            token = %mask_token(&token),
            user = %user.display_name(),
            "login succeeded"
        );
        Ok(&*self.session.insert(Session { token, user }))
    }

    /// Creates an account. No session is established; the caller logs in
    /// afterwards. Returns the name to greet the new user with.
    ///
    /// # Errors
    /// - `Validation` if name, email or password is empty.
    /// - `Network` for transport failures, rejections, or an unexpected
    ///   success status.
    pub async fn register(&mut self, registration: &Registration) -> Result<String> {
        self.error = None;
        if registration.name.trim().is_empty()
            || registration.email.trim().is_empty()
            || registration.password.is_empty()
        {
            return Err(self.fail(Error::validation(
                "Name, email and password are required",
            )));
        }

        tracing::info!(email = %registration.email, "registering account");
        let response = match self.api.register(registration).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err.or_fallback(REGISTER_FALLBACK))),
        };

        if !matches!(response.status, 200 | 201) {
            return Err(self.fail(Error::Network {
                status: Some(response.status),
                message: format!("Registration failed with status: {}", response.status),
                details: None,
            }));
        }

        let greeting = ["name", "userName", "email"]
            .iter()
            .find_map(|field| response.body.get(*field).and_then(Value::as_str))
            .filter(|name| !name.is_empty())
            .map_or_else(|| registration.name.clone(), ToString::to_string);
        Ok(greeting)
    }

    /// Ends the session. Storage failures are logged, never returned.
    pub fn logout(&mut self) {
        tracing::info!("logging out");
        self.purge();
    }

    /// Drops the session in memory and on disk, e.g. after a 401.
    pub fn purge(&mut self) {
        self.session = None;
        self.clear_persisted();
    }

    /// Whether the session token is structurally valid and unexpired.
    ///
    /// Any failure purges the session in memory and on disk, so a `false`
    /// here always leaves the store logged out.
    pub fn check_token(&mut self) -> bool {
        self.validated_claims().is_some()
    }

    fn validated_claims(&mut self) -> Option<TokenClaims> {
        let persisted = match self.storage.get(TOKEN_KEY) {
            Ok(persisted) => persisted,
            Err(err) => {
                tracing::warn!(error = %err, "could not read token");
                self.purge();
                return None;
            }
        };

        // The in-memory session and the persisted copy must agree.
        let current = self.session.as_ref().map(|s| s.token.clone());
        let token = match (current, persisted) {
            (Some(current), Some(stored)) if current == stored => stored,
            (None, Some(stored)) => stored,
            (Some(_), _) => {
                tracing::info!("persisted token no longer matches the session");
                self.purge();
                return None;
            }
            (None, None) => {
                self.purge();
                return None;
            }
        };

        match token::validate(&token) {
            Ok(claims) => Some(claims),
            Err(problem) => {
                tracing::info!(reason = problem.describe(), "discarding unusable token");
                self.purge();
                None
            }
        }
    }

    /// The session, if it is established and its token still validates.
    ///
    /// # Errors
    /// Returns `Auth` (after purging) when there is no usable session.
    pub fn require_session(&mut self) -> Result<&Session> {
        if self.session.is_none() {
            return Err(Error::auth("Not logged in"));
        }
        if self.validated_claims().is_none() {
            return Err(Error::auth("Session expired, please log in again"));
        }
        self.session
            .as_ref()
            .ok_or_else(|| Error::auth("Not logged in"))
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn current_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    /// Message of the last failed login or registration.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn fail(&mut self, err: Error) -> Error {
        tracing::warn!(kind = %err.kind(), error = %err, "session operation failed");
        self.error = Some(err.to_string());
        err
    }

    fn persist(&self, token: &str, user: &UserProfile) -> Result<()> {
        let user_json = serde_json::to_string(user)
            .map_err(|e| Error::Storage(format!("Failed to serialize user: {e}")))?;
        self.storage.set(TOKEN_KEY, token)?;
        self.storage.set(USER_KEY, &user_json)
    }

    fn clear_persisted(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key, error = %err, "failed to clear persisted session");
            }
        }
    }
}
