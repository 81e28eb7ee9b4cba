//! REST gateway and the response normalization applied at its boundary.

mod client;
pub mod normalize;

pub use client::{ApiClient, ApiEvent, ApiResponse, GatewayConfig, USER_AGENT, UpdatedTask};
