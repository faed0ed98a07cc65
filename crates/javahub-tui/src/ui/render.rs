use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use javahub_core::auth::{Role, SessionState};

use crate::app::{App, AppState, CourseFormFocus, LoginFocus, RegisterFocus, Tab};

use super::styles;
use super::views::{compiler, courses, dashboard, practice, quiz, topics};

const BANNER: &str = "Java Learning Hub";

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::Registering => render_register_overlay(frame, app),
        AppState::AddingCourse => render_course_form_overlay(frame, app),
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::EditingCode | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  {}", BANNER);
    let user = match &app.session_state {
        SessionState::Authenticated { username, role } => match role {
            Role::User => format!("{}  [?] Help", username),
            other => format!("{} ({})  [?] Help", username, other),
        },
        SessionState::Anonymous => "Not signed in  [?] Help".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title.clone(), styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + user.chars().count() + 2),
        )),
        Span::styled(user, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        if *tab == app.current_tab {
            spans.push(Span::styled(label, styles::tab_style(true)));
        } else {
            spans.push(Span::styled(label, styles::muted_style()));
        }
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Dashboard => dashboard::render(frame, app, area),
        Tab::Courses => courses::render(frame, app, area),
        Tab::Topics => topics::render(frame, app, area),
        Tab::Practice => practice::render(frame, app, area),
        Tab::Quiz => quiz::render(frame, app, area),
        Tab::Compiler => compiler::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match (app.state, app.current_tab) {
        (AppState::EditingCode, _) => "[Esc] stop editing | [Ctrl+R] run",
        (_, Tab::Courses) => "[a]dd | [d]elete | [r]efresh | [L]ogout | [q]uit",
        (_, Tab::Quiz) => "[a-d] answer | [s]ubmit | [L]ogout | [q]uit",
        (_, Tab::Compiler) => "[e]dit | [Ctrl+R] run | [L]ogout | [q]uit",
        _ => "[r]efresh | [L]ogout | [q]uit",
    };

    let (left_text, left_style) = if let Some(ref error) = app.error_message {
        (format!(" {} ", error), styles::error_style())
    } else if app.is_loading() {
        (" Loading... ".to_string(), styles::highlight_style())
    } else if let Some(ref msg) = app.status_message {
        (format!(" {} ", msg), styles::muted_style())
    } else {
        (String::new(), styles::muted_style())
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

/// Message block for a view that has nothing to show yet
pub fn render_placeholder(frame: &mut Frame, app: &App, area: Rect, title: &str, empty: &str) {
    let line = if let Some(ref error) = app.error_message {
        Line::from(Span::styled(error.clone(), styles::error_style()))
    } else if app.is_loading() {
        Line::from(Span::styled("Loading...", styles::muted_style()))
    } else {
        Line::from(Span::styled(empty.to_string(), styles::muted_style()))
    };

    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(
        Paragraph::new(line).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn help_line(key: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc.to_string(), styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 24, frame.area());
    frame.render_widget(Clear, area);

    let help_text = vec![
        Line::from(Span::styled(format!("  {}", BANNER), styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", env!("CARGO_PKG_VERSION")),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("1-6", "Switch tabs"),
        help_line("←/→", "Prev/next tab (question in a quiz)"),
        help_line("↑/↓", "Navigate list"),
        help_line("Enter", "Open selected item"),
        help_line("Tab", "Switch focus (list ↔ detail)"),
        help_line("Esc", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("r", "Refresh"),
        help_line("a / d", "Add / delete course"),
        help_line("a-d, s", "Answer, submit quiz"),
        help_line("e, Ctrl+R", "Edit, run code"),
        help_line("L", "Log out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    frame.render_widget(Paragraph::new(help_text).block(overlay_block()), area);
}

/// One labelled input field of a form overlay
fn field_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::styled(format!("  {:<12}[", label), styles::muted_style()),
        Span::styled(format!("{:<20}{}", value, cursor), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn button_line(label: &str, focused: bool) -> Line<'static> {
    if focused {
        Line::from(vec![
            Span::raw("            ["),
            Span::styled(format!(" ▶ {} ◀ ", label), styles::selected_style()),
            Span::raw("]"),
        ])
    } else {
        Line::from(vec![
            Span::raw("            ["),
            Span::styled(format!("   {}   ", label), styles::list_item_style()),
            Span::raw("]"),
        ])
    }
}

/// Show the tail of a value that is wider than its field
fn field_tail(value: &str, width: usize) -> String {
    let count = value.chars().count();
    value.chars().skip(count.saturating_sub(width)).collect()
}

fn masked(password: &str) -> String {
    "*".repeat(password.chars().count().min(20))
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let messages = usize::from(app.login_error.is_some()) + usize::from(app.login_notice.is_some());
    let area = centered_rect_fixed(50, 11 + 2 * messages as u16, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(format!("  {}", BANNER), styles::title_style())),
        Line::from(Span::styled("  Sign in to continue", styles::muted_style())),
        Line::from(""),
        field_line(
            "Username:",
            &field_tail(&app.login_username, 20),
            app.login_focus == LoginFocus::Username,
        ),
        field_line(
            "Password:",
            &masked(&app.login_password),
            app.login_focus == LoginFocus::Password,
        ),
        Line::from(""),
        button_line(" Login  ", app.login_focus == LoginFocus::Button),
        button_line("Register", app.login_focus == LoginFocus::Register),
    ];

    if let Some(ref notice) = app.login_notice {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", notice), styles::success_style())));
    }
    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    frame.render_widget(
        Paragraph::new(lines).block(overlay_block()).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_register_overlay(frame: &mut Frame, app: &App) {
    let height = if app.register_error.is_some() { 14 } else { 12 };
    let area = centered_rect_fixed(50, height, frame.area());
    frame.render_widget(Clear, area);

    let role_focused = app.register_focus == RegisterFocus::Role;
    let role_line = Line::from(vec![
        Span::styled(format!("  {:<12}", "Role:"), styles::muted_style()),
        Span::styled(
            format!("◀ {:^7} ▶", app.register_role.as_str()),
            if role_focused {
                styles::selected_style()
            } else {
                styles::list_item_style()
            },
        ),
    ]);

    let mut lines = vec![
        Line::from(Span::styled("  Create an account", styles::title_style())),
        Line::from(""),
        field_line(
            "Username:",
            &field_tail(&app.register_username, 20),
            app.register_focus == RegisterFocus::Username,
        ),
        field_line(
            "Password:",
            &masked(&app.register_password),
            app.register_focus == RegisterFocus::Password,
        ),
        role_line,
        Line::from(""),
        button_line("Register", app.register_focus == RegisterFocus::Button),
        button_line("  Back  ", app.register_focus == RegisterFocus::Back),
    ];

    if let Some(ref error) = app.register_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    frame.render_widget(
        Paragraph::new(lines).block(overlay_block()).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_course_form_overlay(frame: &mut Frame, app: &App) {
    let height = if app.course_form_error.is_some() { 11 } else { 9 };
    let area = centered_rect_fixed(50, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Add course", styles::title_style())),
        Line::from(""),
        field_line(
            "Title:",
            &field_tail(&app.course_form.title, 20),
            app.course_form_focus == CourseFormFocus::Title,
        ),
        field_line(
            "Description:",
            &field_tail(&app.course_form.description, 20),
            app.course_form_focus == CourseFormFocus::Description,
        ),
        Line::from(""),
        button_line("  Save  ", app.course_form_focus == CourseFormFocus::Button),
    ];

    if let Some(ref error) = app.course_form_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    frame.render_widget(
        Paragraph::new(lines).block(overlay_block()).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let title = app
        .selected_course()
        .map(|c| c.title.as_str())
        .unwrap_or_default();
    let lines = vec![
        Line::from(Span::styled("  Delete course?", styles::title_style())),
        Line::from(""),
        Line::from(Span::styled(format!("  {}", title), styles::highlight_style())),
        Line::from(""),
        confirm_line("delete"),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(overlay_block()).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(Span::styled(format!("  {}", BANNER), styles::title_style())),
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        confirm_line("quit"),
    ];

    frame.render_widget(Paragraph::new(lines).block(overlay_block()), area);
}

fn confirm_line(action: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("[Y]", styles::help_key_style()),
        Span::styled(format!(" to {}, ", action), styles::muted_style()),
        Span::styled("[N]", styles::help_key_style()),
        Span::styled(" to cancel", styles::muted_style()),
    ])
}

fn overlay_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default())
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect_fixed(50, 10, outer), Rect::new(25, 15, 50, 10));
        // Larger than the screen is clamped
        assert_eq!(centered_rect_fixed(200, 50, outer), Rect::new(0, 0, 100, 40));
    }

    #[test]
    fn test_field_tail() {
        assert_eq!(field_tail("short", 20), "short");
        assert_eq!(field_tail("abcdefghij", 4), "ghij");
    }

    #[test]
    fn test_masked() {
        assert_eq!(masked("secret"), "******");
        assert_eq!(masked(&"x".repeat(64)).len(), 20);
    }
}
