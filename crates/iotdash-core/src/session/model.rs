use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed session lifetime. Activity never extends it.
pub const SESSION_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Characters in one session id fragment.
const SESSION_ID_FRAGMENT_LEN: usize = 13;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// One authenticated period, persisted under `auth_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "loginTime")]
    pub login_time_ms: i64,
    #[serde(rename = "expires")]
    pub expires_at_ms: i64,
    pub session_id: String,
}

impl Session {
    /// Start a session at `now_ms` with the fixed TTL and a fresh id.
    pub fn start(now_ms: i64) -> Self {
        Self {
            login_time_ms: now_ms,
            expires_at_ms: now_ms + SESSION_TTL_MS,
            session_id: generate_session_id(),
        }
    }

    /// Expired from the expiry instant onwards.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }

    pub fn time_until_expiry(&self, now_ms: i64) -> Duration {
        Duration::milliseconds(self.expires_at_ms - now_ms)
    }

    /// Minutes remaining, floored at zero (for display)
    pub fn minutes_until_expiry(&self, now_ms: i64) -> i64 {
        self.time_until_expiry(now_ms).num_minutes().max(0)
    }
}

/// Two independent random base-36 fragments. Not collision resistant in any
/// adversarial sense; good enough to tell one login from the next.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(SESSION_ID_FRAGMENT_LEN * 2);
    for _ in 0..2 {
        id.extend(
            (0..SESSION_ID_FRAGMENT_LEN).map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char),
        );
    }
    id
}

/// The signed-in principal, persisted under `user_info`.
///
/// Fields other than the three known ones are carried through untouched so
/// a caller-supplied profile survives a save/load cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub login_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserRecord {
    pub fn new(profile: UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            username: profile.username,
            login_time: now,
            last_activity: now,
            extra: profile.extra,
        }
    }

    pub fn touched(&self, now: DateTime<Utc>) -> Self {
        Self {
            last_activity: now,
            ..self.clone()
        }
    }
}

/// Caller-supplied identity used at login instead of the default one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub username: String,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Raw login form input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
