//! Core taskdash library (config, gateway, session and task stores).

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod session;
pub mod tasks;

pub use controller::{Route, TaskClient};
pub use error::{Error, ErrorKind, Result};
