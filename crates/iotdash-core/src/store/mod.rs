//! Durable key-value storage for the session.
//!
//! This module provides:
//! - `KeyValueStore`: string keys to string values, the browser-local-storage shape
//! - `FileStore`: one JSON file per key in the data directory
//! - `MemoryStore`: process-local map, used by tests and embedders
//! - `SessionStore`: typed accessor that reads and writes `auth_session` and
//!   `user_info` together so the two keys cannot drift apart

pub mod backend;
pub mod session_store;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use session_store::{LoadOutcome, SessionStore, SESSION_KEY, USER_KEY};
