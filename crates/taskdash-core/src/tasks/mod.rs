//! Task records and the store that keeps them in step with the server.

mod model;
mod store;

pub use model::{NewTask, Task, TaskId, TaskStats, TaskStatus, TaskUpdate};
pub use store::TaskStore;
