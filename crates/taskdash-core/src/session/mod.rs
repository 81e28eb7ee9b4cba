//! Authenticated session: persisted bearer token plus user profile.

pub mod profile;
pub mod storage;
mod store;
pub mod token;

pub use profile::UserProfile;
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{Credentials, Registration, Session, SessionStore};
