//! Core library for iotdash.
//!
//! - `session`: authentication state machine with fixed-TTL persisted sessions
//! - `store`: durable key-value backends and the typed session/user accessor
//! - `activity`: input listeners and periodic timer that refresh `lastActivity`
//! - `clock`: wall-clock abstraction so expiry can be driven in tests
//! - `config`: application configuration (credential pair, data directory)

pub mod activity;
pub mod clock;
pub mod config;
pub mod error;
pub mod session;
pub mod store;

pub use activity::{ActivityGuard, ActivityKind, ActivitySignal, ActivityTracker, ListenerRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, Config};
pub use error::{ActivityError, SessionError, StoreError};
pub use session::{
    AuthState, Credentials, Session, SessionManager, SessionStatus, UserProfile, UserRecord,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, SessionStore};
