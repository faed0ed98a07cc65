use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::render::render_placeholder;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref dashboard) = app.dashboard else {
        render_placeholder(frame, app, area, "Dashboard", "No progress yet");
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let stat = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<22}", label), styles::muted_style()),
            Span::styled(value, styles::highlight_style()),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        stat("Quizzes taken", dashboard.quizzes_taken.to_string()),
        stat("Total correct answers", dashboard.total_correct_answers.to_string()),
        stat("Last quiz score", dashboard.last_quiz_score_display()),
        Line::from(""),
        stat("Topics viewed", dashboard.topics_viewed.to_string()),
        stat("Courses visited", dashboard.courses_visited.to_string()),
        stat("Practice attempts", dashboard.practice_attempts.to_string()),
        Line::from(""),
        stat("Last active", dashboard.last_active_display()),
    ];
    if let Some(ref error) = app.error_message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let title = match app.session_state.username() {
        Some(username) => format!(" Progress for {} ", username),
        None => " Progress ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    let output = dashboard
        .last_compiled_output
        .as_deref()
        .filter(|o| !o.trim().is_empty());
    let output_lines: Vec<Line> = match output {
        Some(text) => text
            .lines()
            .map(|l| Line::styled(l.to_string(), styles::code_style()))
            .collect(),
        None => vec![Line::from(Span::styled(
            "Nothing compiled yet",
            styles::muted_style(),
        ))],
    };

    let block = Block::default()
        .title(" Last compiled output ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(output_lines).block(block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}
