use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{format_remaining, App, AppState, LoginFocus, Route, Tab};

use super::styles;

/// Visible width of the login form input fields.
const FIELD_WIDTH: usize = 16;

const LOGO: [&str; 3] = [
    "        ╦╔═╗╔╦╗  ╔╦╗╔═╗╔═╗╦ ╦",
    "        ║║ ║ ║    ║║╠═╣╚═╗╠═╣",
    "        ╩╚═╝ ╩   ═╩╝╩ ╩╚═╝╩ ╩",
];

/// Routing guard: nothing of the shell is drawn unless authenticated.
pub fn render(frame: &mut Frame, app: &App) {
    match app.route() {
        Route::Loading => render_loading(frame),
        Route::Login => render_login(frame, app),
        Route::Shell => render_shell(frame, app),
    }
}

fn render_loading(frame: &mut Frame) {
    let area = centered_rect_fixed(30, 3, frame.area());
    let paragraph = Paragraph::new(Line::from(Span::styled(
        "  Loading session...",
        styles::muted_style(),
    )))
    .block(Block::default().borders(Borders::ALL).border_style(styles::border_style(false)));
    frame.render_widget(paragraph, area);
}

fn render_shell(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Navigation
            Constraint::Min(8),    // Page
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0]);
    render_nav_bar(frame, app, chunks[1]);
    render_page(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingLogout => render_confirm_overlay(frame, "Log out of this console?", "log out"),
        AppState::ConfirmingQuit => render_confirm_overlay(frame, "Are you sure you want to quit?", "quit"),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let title = "  IoT Admin Console";
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.len() as u16 + help_hint.len() as u16 + 4)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

/// Page tabs on the left, signed-in user and logout on the right.
fn render_nav_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        spans.push(Span::styled(label, styles::tab_style(*tab == app.current_tab)));
    }

    let username = app
        .session
        .user()
        .map(|u| u.username.as_str())
        .unwrap_or("");
    let user_label = format!("● {}", username);
    let logout_label = "  [L]ogout ";

    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let right = user_label.chars().count() + logout_label.len();
    let padding = (area.width as usize).saturating_sub(used + right);
    spans.push(Span::raw(" ".repeat(padding)));
    spans.push(Span::styled(user_label, styles::success_style()));
    spans.push(Span::styled(logout_label, styles::muted_style()));

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_page(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(format!(" {} ", app.current_tab.title()), styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let lines = match app.current_tab {
        Tab::Dashboard => dashboard_lines(app),
        tab => vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {} is served by the device API and has no console view.", tab.title()),
                styles::muted_style(),
            )),
        ],
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn dashboard_lines(app: &App) -> Vec<Line<'static>> {
    let (Some(user), Some(session)) = (app.session.user(), app.session.session()) else {
        return Vec::new();
    };

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<16}", label), styles::muted_style()),
            Span::styled(value, styles::list_item_style()),
        ])
    };

    let remaining = app
        .session
        .minutes_until_expiry()
        .map(format_remaining)
        .unwrap_or_default();
    let session_prefix: String = session.session_id.chars().take(8).collect();

    vec![
        Line::from(""),
        field("Signed in as", user.username.clone()),
        field(
            "Login time",
            user.login_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        field(
            "Last activity",
            user.last_activity.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        field("Session", format!("{}…", session_prefix)),
        field("Expires in", remaining),
        field(
            "Activity",
            (if app.is_tracking_activity() { "tracked" } else { "not tracked" }).to_string(),
        ),
    ]
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else {
        let remaining = app
            .session
            .minutes_until_expiry()
            .map(format_remaining)
            .unwrap_or_default();
        let last = app
            .session
            .user()
            .map(|u| u.last_activity.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_default();
        format!(" Session expires in {} | Last activity {} ", remaining, last)
    };
    let right_text = " [Tab] next page | [L]ogout | [q]uit ";

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(status_line).style(styles::status_bar_style()), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 13, frame.area());
    frame.render_widget(Clear, area);

    let entry = |key: &str, desc: &str| {
        Line::from(vec![
            Span::styled(format!("  {:<12}", key), styles::help_key_style()),
            Span::styled(desc.to_string(), styles::help_desc_style()),
        ])
    };

    let lines = vec![
        Line::from(Span::styled("  Keyboard shortcuts", styles::title_style())),
        Line::from(""),
        entry("1-5", "Jump to page"),
        entry("Tab / →", "Next page"),
        entry("S-Tab / ←", "Previous page"),
        entry("L", "Log out"),
        entry("?", "Toggle this help"),
        entry("q / Esc", "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  Sessions last 24h from login.",
            styles::muted_style(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_login(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() || app.signing_in { 13 } else { 11 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = LOGO
        .iter()
        .map(|l| Line::from(Span::styled(*l, styles::title_style())))
        .collect();
    lines.push(Line::from(""));

    let username_focused = app.login_focus == LoginFocus::Username;
    let username_style = if username_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if username_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Username: [", styles::muted_style()),
        Span::styled(
            format!("{:<width$}{}", field_tail(&app.login_username), cursor, width = FIELD_WIDTH),
            username_style,
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let password_style = if password_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let masked = "*".repeat(app.login_password.chars().count().min(FIELD_WIDTH));
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{:<width$}{}", masked, cursor, width = FIELD_WIDTH), password_style),
        Span::styled("]", styles::muted_style()),
    ]));

    lines.push(Line::from(""));
    let button_focused = app.login_focus == LoginFocus::Button;
    let (label, style) = if button_focused {
        (" ▶ Login ◀ ", styles::selected_style())
    } else {
        ("   Login   ", styles::list_item_style())
    };
    lines.push(Line::from(vec![
        Span::raw("            ["),
        Span::styled(label, style),
        Span::raw("]"),
    ]));

    if app.signing_in {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("   Signing in...", styles::highlight_style())));
    } else if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_confirm_overlay(frame: &mut Frame, question: &str, action: &str) {
    let area = centered_rect_fixed(46, 9, frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = LOGO
        .iter()
        .map(|l| Line::from(Span::styled(*l, styles::title_style())))
        .collect();
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(format!("   {}", question), styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(format!(" to {}, ", action), styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// The last `FIELD_WIDTH` characters of a form value, so the end being
/// typed stays visible.
fn field_tail(value: &str) -> &str {
    let len = value.chars().count();
    if len <= FIELD_WIDTH {
        return value;
    }
    let start = value
        .char_indices()
        .nth(len - FIELD_WIDTH)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &value[start..]
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
