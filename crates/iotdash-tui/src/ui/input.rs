//! Keyboard input handling for the TUI.
//!
//! Translates key events into login form edits, page navigation and the
//! logout/quit confirmations. Activity recording happens before this, in
//! the main loop, for every event.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::{can_add_password_char, can_add_username_char, App, AppState, LoginFocus, Route, Tab};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match app.route() {
        Route::Loading => false,
        Route::Login => handle_login_input(app, key),
        Route::Shell => handle_shell_input(app, key),
    }
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> bool {
    // Form is frozen while the sign-in delay runs.
    if app.signing_in {
        return false;
    }

    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return true;
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.begin_sign_in(),
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    false
}

fn handle_shell_input(app: &mut App, key: KeyEvent) -> bool {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            false
        }
        AppState::ConfirmingLogout => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.logout(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.state = AppState::Normal,
                _ => {}
            }
            false
        }
        AppState::ConfirmingQuit => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                app.state = AppState::Quitting;
                true
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
                false
            }
            _ => false,
        },
        AppState::Quitting => true,
        AppState::Normal => {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
                KeyCode::Char('?') => app.state = AppState::ShowingHelp,
                KeyCode::Char('L') | KeyCode::Char('l') => app.state = AppState::ConfirmingLogout,
                KeyCode::Tab | KeyCode::Right => app.current_tab = app.current_tab.next(),
                KeyCode::BackTab | KeyCode::Left => app.current_tab = app.current_tab.prev(),
                KeyCode::Char(c) => {
                    if let Some(tab) = Tab::from_digit(c) {
                        app.current_tab = tab;
                    }
                }
                _ => {}
            }
            false
        }
    }
}
