use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use javahub_core::utils::line_count;

use crate::app::{App, AppState};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_editor(frame, app, chunks[0]);
    render_output(frame, app, chunks[1]);
}

fn render_editor(frame: &mut Frame, app: &App, area: Rect) {
    let editing = app.state == AppState::EditingCode;

    let mut lines: Vec<Line> = if app.code.is_empty() && !editing {
        vec![Line::from(Span::styled(
            "Press [e] to write Java code. Include a public class with a main method.",
            styles::muted_style(),
        ))]
    } else {
        app.code
            .split('\n')
            .enumerate()
            .map(|(i, l)| {
                Line::from(vec![
                    Span::styled(format!("{:>3} ", i + 1), styles::muted_style()),
                    Span::styled(l.to_string(), styles::code_style()),
                ])
            })
            .collect()
    };
    if editing {
        if let Some(last) = lines.last_mut() {
            last.spans.push(Span::styled("▌", styles::highlight_style()));
        }
    }

    // Keep the cursor line in view
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;

    let title = format!(
        " Java code ({} lines){} ",
        line_count(&app.code),
        if editing { " - editing" } else { "" }
    );
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(editing));
    frame.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);
}

fn render_output(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let result = app.compile_result.as_ref();

    let output: Vec<Line> = match result.and_then(|r| r.output()) {
        Some(text) => text.lines().map(|l| Line::from(l.to_string())).collect(),
        None if app.is_loading() => vec![Line::from(Span::styled("Running...", styles::muted_style()))],
        None => Vec::new(),
    };
    let block = Block::default()
        .title(" Output ")
        .title_style(styles::success_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(output).block(block).wrap(Wrap { trim: false }),
        chunks[0],
    );

    // Server-reported errors, or the request's own failure
    let errors: Vec<Line> = match (result.and_then(|r| r.errors()), &app.error_message) {
        (Some(text), _) => text
            .lines()
            .map(|l| Line::styled(l.to_string(), styles::error_style()))
            .collect(),
        (None, Some(message)) => vec![Line::styled(message.clone(), styles::error_style())],
        (None, None) => Vec::new(),
    };
    let block = Block::default()
        .title(" Errors ")
        .title_style(styles::error_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(errors).block(block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}
