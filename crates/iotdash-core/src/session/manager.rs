use chrono::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::SessionError;
use crate::store::{KeyValueStore, LoadOutcome, SessionStore};

use super::model::{Credentials, Session, UserProfile, UserRecord};

/// Observable authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// The persisted session has not been checked yet.
    Uninitialized,
    Unauthenticated,
    Authenticated,
}

/// Result of `check_session`, handed to consumers as a read-only copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user: Option<UserRecord>,
}

enum State {
    Uninitialized,
    Unauthenticated,
    Authenticated { session: Session, user: UserRecord },
}

/// Owns authentication state and the only write path to the session store.
pub struct SessionManager<S, C = SystemClock> {
    store: SessionStore<S>,
    clock: C,
    auth: AuthConfig,
    state: State,
}

impl<S: KeyValueStore> SessionManager<S, SystemClock> {
    pub fn new(backend: S, auth: AuthConfig) -> Self {
        Self::with_clock(backend, auth, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> SessionManager<S, C> {
    pub fn with_clock(backend: S, auth: AuthConfig, clock: C) -> Self {
        Self {
            store: SessionStore::new(backend),
            clock,
            auth,
            state: State::Uninitialized,
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Read the persisted session and settle the authentication state.
    ///
    /// Never fails: missing, partial, unparsable or expired state is purged
    /// and reported as unauthenticated.
    pub fn check_session(&mut self) -> SessionStatus {
        match self.store.load() {
            LoadOutcome::Empty => {
                debug!("No persisted session");
                self.state = State::Unauthenticated;
            }
            LoadOutcome::Corrupt(reason) => {
                warn!(%reason, "Discarding unreadable session");
                self.purge();
            }
            LoadOutcome::Found(session, user) => {
                let now_ms = self.clock.now_ms();
                if session.is_expired_at(now_ms) {
                    info!(
                        session_id = %session.session_id,
                        expired_at = session.expires_at_ms,
                        "Persisted session expired"
                    );
                    self.purge();
                } else {
                    debug!(
                        username = %user.username,
                        minutes_left = session.minutes_until_expiry(now_ms),
                        "Restored session"
                    );
                    self.state = State::Authenticated { session, user };
                }
            }
        }
        self.status()
    }

    /// Compare the credentials with the configured pair and start a session.
    ///
    /// `profile` replaces the default identity (the configured username).
    /// Nothing changes, in memory or on disk, unless the whole login succeeds.
    pub fn login(
        &mut self,
        credentials: &Credentials,
        profile: Option<UserProfile>,
    ) -> Result<UserRecord, SessionError> {
        if credentials.username != self.auth.username || credentials.password != self.auth.password {
            info!(username = %credentials.username, "Login rejected");
            return Err(SessionError::InvalidCredentials);
        }

        if let State::Authenticated { ref session, .. } = self.state {
            debug!(session_id = %session.session_id, "Replacing active session");
        }

        let now = self.clock.now();
        let session = Session::start(now.timestamp_millis());
        let profile = profile.unwrap_or_else(|| UserProfile::new(self.auth.username.clone()));
        let user = UserRecord::new(profile, now);

        self.store.save(&session, &user)?;

        info!(
            username = %user.username,
            session_id = %session.session_id,
            "Login successful, session created"
        );
        self.state = State::Authenticated {
            session,
            user: user.clone(),
        };
        Ok(user)
    }

    /// Clear the persisted session. Always succeeds.
    pub fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        if matches!(self.state, State::Authenticated { .. }) {
            info!("Logout successful, session cleared");
        }
        self.state = State::Unauthenticated;
    }

    /// Record activity on the current user. Does nothing when signed out and
    /// never moves the session expiry.
    pub fn update_last_activity(&mut self) -> Result<(), SessionError> {
        if self.expire_if_due() {
            return Ok(());
        }
        let now = self.clock.now();
        let State::Authenticated { ref mut user, .. } = self.state else {
            return Ok(());
        };

        let updated = user.touched(now);
        self.store.save_user(&updated)?;
        *user = updated;
        Ok(())
    }

    /// Drop to unauthenticated if the session has reached its expiry.
    /// Returns true when that transition happened.
    pub fn expire_if_due(&mut self) -> bool {
        let now_ms = self.clock.now_ms();
        let expired = match self.state {
            State::Authenticated { ref session, .. } => session.is_expired_at(now_ms),
            _ => false,
        };
        if expired {
            info!("Session expired");
            self.purge();
        }
        expired
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> AuthState {
        match self.state {
            State::Uninitialized => AuthState::Uninitialized,
            State::Unauthenticated => AuthState::Unauthenticated,
            State::Authenticated { .. } => AuthState::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, State::Authenticated { .. })
    }

    /// True until the persisted session has been checked once.
    pub fn is_loading(&self) -> bool {
        matches!(self.state, State::Uninitialized)
    }

    pub fn user(&self) -> Option<&UserRecord> {
        match self.state {
            State::Authenticated { ref user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self.state {
            State::Authenticated { ref session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            authenticated: self.is_authenticated(),
            user: self.user().cloned(),
        }
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.session()
            .map(|s| s.time_until_expiry(self.clock.now_ms()))
    }

    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.session()
            .map(|s| s.minutes_until_expiry(self.clock.now_ms()))
    }

    fn purge(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to purge session state");
        }
        self.state = State::Unauthenticated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{MemoryStore, SESSION_KEY, USER_KEY};

    fn auth() -> AuthConfig {
        AuthConfig {
            username: "a".to_string(),
            password: "b".to_string(),
        }
    }

    fn manager() -> (SessionManager<MemoryStore, ManualClock>, MemoryStore, ManualClock) {
        let store = MemoryStore::new();
        let clock = ManualClock::at_ms(0);
        let manager = SessionManager::with_clock(store.clone(), auth(), clock.clone());
        (manager, store, clock)
    }

    #[test]
    fn test_starts_uninitialized() {
        let (manager, _, _) = manager();
        assert_eq!(manager.state(), AuthState::Uninitialized);
        assert!(manager.is_loading());
        assert!(manager.user().is_none());
    }

    #[test]
    fn test_check_empty_store_settles_unauthenticated() {
        let (mut manager, store, _) = manager();
        let status = manager.check_session();
        assert!(!status.authenticated);
        assert!(status.user.is_none());
        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert!(!manager.is_loading());
        assert!(store.is_empty());
    }

    #[test]
    fn test_login_uses_default_identity() {
        let (mut manager, store, _) = manager();
        manager.check_session();
        let user = manager.login(&Credentials::new("a", "b"), None).unwrap();

        assert_eq!(user.username, "a");
        assert_eq!(user.login_time, user.last_activity);
        assert!(manager.is_authenticated());
        assert_eq!(manager.session().unwrap().expires_at_ms, 86_400_000);
        assert_eq!(store.keys(), vec![SESSION_KEY.to_string(), USER_KEY.to_string()]);
    }

    #[test]
    fn test_login_with_profile() {
        let (mut manager, _, _) = manager();
        let profile = UserProfile::new("Site Operator").with_field("role", "admin");
        let user = manager.login(&Credentials::new("a", "b"), Some(profile)).unwrap();

        assert_eq!(user.username, "Site Operator");
        assert_eq!(manager.user().unwrap().extra["role"], "admin");
    }

    #[test]
    fn test_login_mismatch_is_reported() {
        let (mut manager, store, _) = manager();
        manager.check_session();

        for creds in [
            Credentials::new("a", "wrong"),
            Credentials::new("wrong", "b"),
            Credentials::new("A", "b"),
            Credentials::new("", ""),
        ] {
            let err = manager.login(&creds, None).unwrap_err();
            assert!(matches!(err, SessionError::InvalidCredentials));
        }
        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert!(store.is_empty());
    }

    #[test]
    fn test_login_write_failure_changes_nothing() {
        let (mut manager, store, _) = manager();
        manager.check_session();
        store.fail_writes(true);

        let err = manager.login(&Credentials::new("a", "b"), None).unwrap_err();
        assert!(matches!(err, SessionError::Store(_)));
        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_activity_moves_timestamp_not_expiry() {
        let (mut manager, _, clock) = manager();
        manager.login(&Credentials::new("a", "b"), None).unwrap();
        let login_time = manager.user().unwrap().login_time;

        clock.advance(Duration::hours(3));
        manager.update_last_activity().unwrap();

        let user = manager.user().unwrap();
        assert_eq!(user.login_time, login_time);
        assert_eq!(user.last_activity, clock.now());
        assert_eq!(manager.session().unwrap().expires_at_ms, 86_400_000);
        assert_eq!(manager.minutes_until_expiry(), Some(21 * 60));
    }

    #[test]
    fn test_update_activity_write_failure_keeps_memory() {
        let (mut manager, store, clock) = manager();
        manager.login(&Credentials::new("a", "b"), None).unwrap();
        let before = manager.user().unwrap().clone();

        clock.advance(Duration::minutes(5));
        store.fail_writes(true);
        assert!(manager.update_last_activity().is_err());
        assert_eq!(manager.user(), Some(&before));
        assert!(manager.is_authenticated());
    }

    #[test]
    fn test_update_activity_after_deadline_logs_out() {
        let (mut manager, store, clock) = manager();
        manager.login(&Credentials::new("a", "b"), None).unwrap();

        clock.set_ms(86_400_000);
        manager.update_last_activity().unwrap();
        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert!(store.is_empty());
    }

    #[test]
    fn test_expire_if_due() {
        let (mut manager, _, clock) = manager();
        manager.login(&Credentials::new("a", "b"), None).unwrap();

        clock.set_ms(86_399_999);
        assert!(!manager.expire_if_due());
        assert!(manager.is_authenticated());

        clock.set_ms(86_400_000);
        assert!(manager.expire_if_due());
        assert!(!manager.is_authenticated());
        assert!(!manager.expire_if_due());
    }

    #[test]
    fn test_logout_clears_state() {
        let (mut manager, store, _) = manager();
        manager.login(&Credentials::new("a", "b"), None).unwrap();
        manager.logout();

        assert_eq!(manager.state(), AuthState::Unauthenticated);
        assert!(manager.time_until_expiry().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_relogin_replaces_session() {
        let (mut manager, _, clock) = manager();
        manager.login(&Credentials::new("a", "b"), None).unwrap();
        let first = manager.session().unwrap().session_id.clone();

        clock.advance(Duration::minutes(1));
        manager.login(&Credentials::new("a", "b"), None).unwrap();
        let second = manager.session().unwrap();
        assert_ne!(second.session_id, first);
        assert_eq!(second.expires_at_ms, 60_000 + 86_400_000);
    }

    #[test]
    fn test_store_follows_authentication_state() {
        let (mut manager, store, clock) = manager();
        let both = vec![SESSION_KEY.to_string(), USER_KEY.to_string()];

        manager.check_session();
        assert!(store.is_empty());

        manager.login(&Credentials::new("a", "b"), None).unwrap();
        assert!(manager.is_authenticated());
        assert_eq!(store.keys(), both);

        clock.advance(Duration::hours(1));
        manager.update_last_activity().unwrap();
        assert_eq!(store.keys(), both);

        manager.logout();
        assert!(!manager.is_authenticated());
        assert!(store.is_empty());

        manager.login(&Credentials::new("a", "b"), None).unwrap();
        clock.advance(Duration::hours(24));
        assert!(manager.expire_if_due());
        assert!(store.is_empty());
    }
}
