use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::session::{Session, UserRecord};

use super::backend::KeyValueStore;

/// Key holding the serialized `Session`.
pub const SESSION_KEY: &str = "auth_session";

/// Key holding the serialized `UserRecord`.
pub const USER_KEY: &str = "user_info";

/// What was found in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Neither key present.
    Empty,
    /// Both keys present and parseable.
    Found(Session, UserRecord),
    /// Anything else: one key missing, bad JSON, unreadable storage.
    Corrupt(String),
}

/// Typed accessor over the two session keys.
pub struct SessionStore<S> {
    backend: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn load(&self) -> LoadOutcome {
        let session = match self.backend.get(SESSION_KEY) {
            Ok(v) => v,
            Err(e) => return LoadOutcome::Corrupt(e.to_string()),
        };
        let user = match self.backend.get(USER_KEY) {
            Ok(v) => v,
            Err(e) => return LoadOutcome::Corrupt(e.to_string()),
        };

        match (session, user) {
            (None, None) => LoadOutcome::Empty,
            (Some(_), None) => LoadOutcome::Corrupt(format!("'{}' without '{}'", SESSION_KEY, USER_KEY)),
            (None, Some(_)) => LoadOutcome::Corrupt(format!("'{}' without '{}'", USER_KEY, SESSION_KEY)),
            (Some(session), Some(user)) => {
                let session: Session = match serde_json::from_str(&session) {
                    Ok(s) => s,
                    Err(e) => return LoadOutcome::Corrupt(format!("bad '{}': {}", SESSION_KEY, e)),
                };
                let user: UserRecord = match serde_json::from_str(&user) {
                    Ok(u) => u,
                    Err(e) => return LoadOutcome::Corrupt(format!("bad '{}': {}", USER_KEY, e)),
                };
                LoadOutcome::Found(session, user)
            }
        }
    }

    /// Persist both records as one unit. On failure the previous contents of
    /// both keys are put back. A key whose previous value could not be read
    /// is left as the failed write left it.
    pub fn save(&self, session: &Session, user: &UserRecord) -> Result<(), StoreError> {
        let session_json = to_json(SESSION_KEY, session)?;
        let user_json = to_json(USER_KEY, user)?;

        let previous_session = self.backend.get(SESSION_KEY);
        let previous_user = self.backend.get(USER_KEY);

        let result = self
            .backend
            .set(SESSION_KEY, &session_json)
            .and_then(|()| self.backend.set(USER_KEY, &user_json));

        if let Err(e) = result {
            warn!(error = %e, "Session write failed, restoring previous state");
            self.restore(SESSION_KEY, previous_session);
            self.restore(USER_KEY, previous_user);
            return Err(e);
        }

        debug!(session_id = %session.session_id, username = %user.username, "Session saved");
        Ok(())
    }

    /// Rewrite the user record of an already-saved session.
    pub fn save_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let user_json = to_json(USER_KEY, user)?;
        self.backend.set(USER_KEY, &user_json)
    }

    /// Remove both keys. Both removals are attempted; the first error wins.
    pub fn clear(&self) -> Result<(), StoreError> {
        let session = self.backend.remove(SESSION_KEY);
        let user = self.backend.remove(USER_KEY);
        session.and(user)
    }

    fn restore(&self, key: &str, previous: Result<Option<String>, StoreError>) {
        let result = match previous {
            Ok(Some(value)) => self.backend.set(key, &value),
            Ok(None) => self.backend.remove(key),
            Err(e) => {
                warn!(key, error = %e, "Previous value unreadable, not restoring");
                return;
            }
        };
        if let Err(e) = result {
            warn!(key, error = %e, "Failed to restore key after write failure");
        }
    }
}

fn to_json<T: Serialize>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserProfile;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn sample() -> (Session, UserRecord) {
        (
            Session::start(0),
            UserRecord::new(UserProfile::new("ops"), Utc::now()),
        )
    }

    #[test]
    fn test_empty_store_loads_empty() {
        let store = SessionStore::new(MemoryStore::new());
        assert_eq!(store.load(), LoadOutcome::Empty);
    }

    #[test]
    fn test_save_then_load() {
        let store = SessionStore::new(MemoryStore::new());
        let (session, user) = sample();
        store.save(&session, &user).unwrap();

        assert_eq!(store.load(), LoadOutcome::Found(session, user));
        assert_eq!(
            store.backend().keys(),
            vec![SESSION_KEY.to_string(), USER_KEY.to_string()]
        );
    }

    #[test]
    fn test_half_present_is_corrupt() {
        let backend = MemoryStore::new();
        backend.set(SESSION_KEY, r#"{"loginTime":0,"expires":1,"sessionId":"x"}"#).unwrap();
        let store = SessionStore::new(backend);
        assert!(matches!(store.load(), LoadOutcome::Corrupt(_)));
    }

    #[test]
    fn test_bad_json_is_corrupt() {
        let backend = MemoryStore::new();
        backend.set(SESSION_KEY, "{not json").unwrap();
        backend.set(USER_KEY, r#"{"username":"ops"}"#).unwrap();
        let store = SessionStore::new(backend);
        assert!(matches!(store.load(), LoadOutcome::Corrupt(_)));
    }

    #[test]
    fn test_failed_second_write_restores_previous_state() {
        let backend = MemoryStore::new();
        let store = SessionStore::new(backend.clone());
        let (first_session, first_user) = sample();
        store.save(&first_session, &first_user).unwrap();

        backend.fail_writes_for(Some(USER_KEY));
        let second = Session::start(10);
        assert!(store.save(&second, &first_user).is_err());

        backend.fail_writes_for(None);
        assert_eq!(store.load(), LoadOutcome::Found(first_session, first_user));
    }

    #[test]
    fn test_failed_write_on_empty_store_leaves_it_empty() {
        let backend = MemoryStore::new();
        backend.fail_writes_for(Some(USER_KEY));
        let store = SessionStore::new(backend.clone());
        let (session, user) = sample();

        assert!(store.save(&session, &user).is_err());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_key_that_could_not_be_snapshotted() {
        let backend = MemoryStore::new();
        let store = SessionStore::new(backend.clone());
        let (first_session, first_user) = sample();
        store.save(&first_session, &first_user).unwrap();

        backend.fail_reads_for(Some(SESSION_KEY));
        backend.fail_writes_for(Some(USER_KEY));
        let second = Session::start(10);
        assert!(store.save(&second, &first_user).is_err());

        backend.fail_reads_for(None);
        backend.fail_writes_for(None);
        assert_eq!(backend.keys(), vec![SESSION_KEY.to_string(), USER_KEY.to_string()]);
        let user_json = backend.get(USER_KEY).unwrap().unwrap();
        let restored: UserRecord = serde_json::from_str(&user_json).unwrap();
        assert_eq!(restored, first_user);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let backend = MemoryStore::new();
        let store = SessionStore::new(backend.clone());
        let (session, user) = sample();
        store.save(&session, &user).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(backend.is_empty());
    }
}
