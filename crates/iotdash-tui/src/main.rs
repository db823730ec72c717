//! iotdash - terminal admin console for IoT devices.
//!
//! Shows a login form until a session exists, then the console shell. The
//! session lasts 24 hours from login and survives restarts; activity in the
//! console is recorded on the signed-in user.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use iotdash_core::{Config, Credentials, FileStore, SessionManager};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Initialize logging to `<data_dir>/iotdash.log`; the terminal belongs to
/// the UI. Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let writer: Box<dyn Write + Send> = match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("iotdash")
        .filename_suffix("log")
        .build(log_dir)
    {
        Ok(appender) => Box::new(appender),
        Err(_) => Box::new(io::sink()),
    };
    let (writer, guard) = tracing_appender::non_blocking(writer);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {:#}. Using default configuration.", e);
        Config::default()
    });
    let data_dir = config.data_dir()?;
    let _log_guard = init_tracing(&data_dir);

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        return match args[1].as_str() {
            "--check-session" => check_session_cli(config),
            "--login" => login_cli(config),
            "--logout" => logout_cli(config),
            other => Err(anyhow::anyhow!(
                "Unknown argument '{}'. Expected --check-session, --login or --logout",
                other
            )),
        };
    }

    info!("iotdash starting");

    let mut app = App::new(config)?;
    if let Ok(path) = Config::default_path() {
        app = app.with_config_path(path);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Draw the loading state once, then settle it from the persisted session
    terminal.draw(|f| render(f, &app))?;
    app.check_session();

    let result = run_app(&mut terminal, &mut app).await;

    // Stops the activity timer and removes listeners before the terminal goes
    drop(app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("iotdash shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // The "Signing in..." frame is on screen now
        if app.signing_in {
            app.finish_sign_in().await;
            continue;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            let event = event::read()?;
            app.record_input(&event);

            if let Event::Key(key) = event {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key) {
                    return Ok(());
                }
            }
        }

        app.process_activity();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// Command-line session management
// ============================================================================

fn open_session(config: &Config) -> Result<SessionManager<FileStore>> {
    let data_dir = config.data_dir()?;
    Ok(SessionManager::new(FileStore::new(data_dir), config.auth.clone()))
}

/// Print whether a persisted session is active
fn check_session_cli(config: Config) -> Result<()> {
    let mut session = open_session(&config)?;
    let status = session.check_session();

    match status.user {
        Some(user) if status.authenticated => {
            println!("Signed in as {}", user.username);
            println!("  Login time:    {}", user.login_time.to_rfc3339());
            println!("  Last activity: {}", user.last_activity.to_rfc3339());
            if let Some(minutes) = session.minutes_until_expiry() {
                println!("  Expires in:    {}", app::format_remaining(minutes));
            }
        }
        _ => println!("Not signed in"),
    }
    Ok(())
}

fn login_cli(mut config: Config) -> Result<()> {
    let mut session = open_session(&config)?;
    session.check_session();

    print!(
        "Username{}: ",
        config
            .last_username
            .as_deref()
            .map(|u| format!(" [{}]", u))
            .unwrap_or_default()
    );
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let username = match input.trim() {
        "" => config.last_username.clone().unwrap_or_default(),
        name => name.to_string(),
    };

    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    let user = session
        .login(&Credentials::new(username.clone(), password), None)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Login successful! Signed in as {}", user.username);
    Ok(())
}

fn logout_cli(config: Config) -> Result<()> {
    let mut session = open_session(&config)?;
    session.logout();
    println!("Signed out");
    Ok(())
}
