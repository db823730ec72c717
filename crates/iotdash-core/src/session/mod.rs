//! Authentication state and session lifecycle.
//!
//! This module provides:
//! - `SessionManager`: login/logout, persisted-session restore, activity updates
//! - `Session` / `UserRecord`: the two records persisted side by side
//!
//! Sessions last a fixed 24 hours from login. Activity refreshes the user's
//! `lastActivity` timestamp but never pushes the expiry back.

pub mod manager;
pub mod model;

pub use manager::{AuthState, SessionManager, SessionStatus};
pub use model::{generate_session_id, Credentials, Session, UserProfile, UserRecord, SESSION_TTL_MS};
