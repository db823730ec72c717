//! Application state management for the iotdash console.
//!
//! `App` owns the `SessionManager` and is the only caller of its mutating
//! operations. Terminal input is forwarded to the activity listeners, and
//! the signals they produce are drained here on the UI loop.

use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{Event, KeyEventKind, MouseEventKind};
use iotdash_core::activity::{ActivityGuard, ActivityKind, ActivitySignal, ActivityTracker, ListenerRegistry};
use iotdash_core::{Config, Credentials, FileStore, SessionError, SessionManager};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Routing
// ============================================================================

/// Which surface the console shows, decided from the session state alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Loading,
    Login,
    Shell,
}

impl Route {
    pub fn from_status(authenticated: bool, is_loading: bool) -> Self {
        if is_loading {
            Route::Loading
        } else if authenticated {
            Route::Shell
        } else {
            Route::Login
        }
    }
}

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Files,
    Camera,
    Database,
    System,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Dashboard, Tab::Files, Tab::Camera, Tab::Database, Tab::System];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Files => "Files",
            Tab::Camera => "Camera",
            Tab::Database => "Database",
            Tab::System => "System Monitor",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Files,
            Tab::Files => Tab::Camera,
            Tab::Camera => Tab::Database,
            Tab::Database => Tab::System,
            Tab::System => Tab::Dashboard,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::System,
            Tab::Files => Tab::Dashboard,
            Tab::Camera => Tab::Files,
            Tab::Database => Tab::Camera,
            Tab::System => Tab::Database,
        }
    }

    /// Tab bound to a number key, 1-based.
    pub fn from_digit(c: char) -> Option<Self> {
        let index = c.to_digit(10)? as usize;
        Tab::ALL.get(index.checked_sub(1)?).copied()
    }
}

/// Overlay state inside the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingLogout,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    /// Where `last_username` is remembered. `None` keeps the config in memory.
    config_path: Option<PathBuf>,
    pub session: SessionManager<FileStore>,
    tracker: ActivityTracker,
    activity: Option<(ActivityGuard, UnboundedReceiver<ActivitySignal>)>,

    pub state: AppState,
    pub current_tab: Tab,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    /// Set while the artificial delay before the credential check runs.
    pub signing_in: bool,

    pub status_message: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        debug!(?data_dir, "Session store directory configured");

        let session = SessionManager::new(FileStore::new(data_dir), config.auth.clone());
        let tracker = ActivityTracker::new(ListenerRegistry::shared());
        let login_username = config.last_username.clone().unwrap_or_default();

        Ok(Self {
            config,
            config_path: None,
            session,
            tracker,
            activity: None,

            state: AppState::Normal,
            current_tab: Tab::Dashboard,

            login_username,
            login_password: String::new(),
            login_focus: LoginFocus::Username,
            login_error: None,
            signing_in: false,

            status_message: None,
        })
    }

    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn route(&self) -> Route {
        Route::from_status(self.session.is_authenticated(), self.session.is_loading())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Settle the initial authentication state from the persisted session.
    pub fn check_session(&mut self) {
        let status = self.session.check_session();
        info!(authenticated = status.authenticated, "Session checked");
        self.sync_activity_tracking();
        if !status.authenticated {
            self.start_login();
        }
    }

    /// Reset the login form for a fresh attempt.
    pub fn start_login(&mut self) {
        self.state = AppState::Normal;
        self.login_password.clear();
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.signing_in = false;
    }

    /// Validate the form and arm the sign-in. The actual check happens in
    /// `finish_sign_in` after the loading indicator has been drawn.
    pub fn begin_sign_in(&mut self) {
        if self.login_username.is_empty() || self.login_password.is_empty() {
            self.login_error = Some("Username and password required".to_string());
            return;
        }
        self.login_error = None;
        self.signing_in = true;
    }

    pub async fn finish_sign_in(&mut self) {
        if !self.signing_in {
            return;
        }
        // Purely cosmetic, gives the spinner time to show.
        tokio::time::sleep(self.config.login_delay()).await;
        self.signing_in = false;

        let credentials = Credentials::new(self.login_username.clone(), self.login_password.clone());
        match self.session.login(&credentials, None) {
            Ok(user) => {
                self.login_password.clear();
                self.login_error = None;
                self.status_message = None;
                self.current_tab = Tab::Dashboard;
                self.state = AppState::Normal;

                self.config.last_username = Some(self.login_username.clone());
                if let Some(ref path) = self.config_path {
                    if let Err(e) = self.config.save_to(path) {
                        warn!(error = %e, "Failed to save config");
                    }
                }

                info!(username = %user.username, "Signed in");
                self.sync_activity_tracking();
            }
            Err(e) => {
                if let SessionError::Store(ref source) = e {
                    warn!(error = %source, "Could not persist session");
                }
                self.login_password.clear();
                self.login_focus = LoginFocus::Password;
                self.login_error = Some(e.user_message());
            }
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.sync_activity_tracking();
        self.status_message = None;
        self.start_login();
    }

    /// Listeners and timer exist exactly while the session is authenticated.
    fn sync_activity_tracking(&mut self) {
        match (self.session.is_authenticated(), self.activity.is_some()) {
            (true, false) => match self.tracker.start() {
                Ok(tracking) => self.activity = Some(tracking),
                Err(e) => warn!(error = %e, "Activity tracking unavailable"),
            },
            (false, true) => self.activity = None,
            _ => {}
        }
    }

    pub fn is_tracking_activity(&self) -> bool {
        self.activity
            .as_ref()
            .is_some_and(|(guard, _)| guard.listener_count() > 0)
    }

    // =========================================================================
    // Activity
    // =========================================================================

    /// Hand a terminal event to the activity listeners, if any are installed.
    pub fn record_input(&self, event: &Event) {
        if let Some(kind) = activity_kind(event) {
            self.tracker.dispatch(kind);
        }
    }

    /// Apply pending activity signals, then the expiry check.
    pub fn process_activity(&mut self) {
        let mut pending = 0usize;
        if let Some((_, ref mut rx)) = self.activity {
            while let Ok(signal) = rx.try_recv() {
                if matches!(signal, ActivitySignal::Tick) {
                    debug!("Activity timer tick");
                }
                pending += 1;
            }
        }

        for _ in 0..pending {
            match self.session.update_last_activity() {
                Ok(()) => self.status_message = None,
                Err(e) => {
                    warn!(error = %e, "Failed to record activity");
                    self.status_message = Some("Could not save activity".to_string());
                    break;
                }
            }
        }

        self.check_expiry();
    }

    fn check_expiry(&mut self) {
        let lost = self.session.expire_if_due() || (self.activity.is_some() && !self.session.is_authenticated());
        if lost {
            self.sync_activity_tracking();
            self.start_login();
            self.login_error = Some("Session expired. Please log in again.".to_string());
        }
    }
}

/// Map a terminal event onto the tracked interaction kinds. Terminals have
/// no touch input, so `TouchStart` is never produced here.
pub fn activity_kind(event: &Event) -> Option<ActivityKind> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => Some(ActivityKind::KeyPress),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(_) => Some(ActivityKind::PointerDown),
            MouseEventKind::Up(_) => Some(ActivityKind::Click),
            MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(ActivityKind::PointerMove),
            MouseEventKind::ScrollUp
            | MouseEventKind::ScrollDown
            | MouseEventKind::ScrollLeft
            | MouseEventKind::ScrollRight => Some(ActivityKind::Scroll),
        },
        _ => None,
    }
}

/// "5h 12m" style countdown.
pub fn format_remaining(minutes: i64) -> String {
    let minutes = minutes.max(0);
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
