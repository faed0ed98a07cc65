use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use javahub_core::utils::truncate_string;

use crate::app::{App, Focus};
use crate::ui::render::render_placeholder;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.practice_questions.is_empty() {
        render_placeholder(frame, app, area, "Practice", "No practice questions available");
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let width = chunks[0].width.saturating_sub(16) as usize;
    let items: Vec<ListItem> = app
        .practice_questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let style = if i == app.practice_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let difficulty = question.difficulty.as_deref().unwrap_or("");
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<width$} ", truncate_string(&question.title, width))),
                Span::styled(difficulty.to_string(), styles::muted_style()),
            ]))
            .style(style)
        })
        .collect();

    let block = Block::default()
        .title(format!(" Practice ({}) ", app.practice_questions.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.focus == Focus::List));
    let mut state = ListState::default();
    state.select(Some(app.practice_selection));
    frame.render_stateful_widget(List::new(items).block(block), chunks[0], &mut state);

    render_question(frame, app, chunks[1]);
}

fn render_question(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Detail;
    let question = app
        .practice_detail
        .as_ref()
        .or_else(|| app.practice_questions.get(app.practice_selection));

    let mut lines = Vec::new();
    if let Some(question) = question {
        if let Some(ref difficulty) = question.difficulty {
            lines.push(Line::from(vec![
                Span::styled("Difficulty: ", styles::muted_style()),
                Span::raw(difficulty.clone()),
            ]));
            lines.push(Line::from(""));
        }
        if let Some(ref description) = question.description {
            lines.extend(description.lines().map(|l| Line::from(l.to_string())));
            lines.push(Line::from(""));
        }
        for (label, sample) in [
            ("Sample input", &question.sample_input),
            ("Sample output", &question.sample_output),
        ] {
            if let Some(sample) = sample.as_deref().filter(|s| !s.is_empty()) {
                lines.push(Line::from(Span::styled(label, styles::highlight_style())));
                lines.extend(
                    sample
                        .lines()
                        .map(|l| Line::styled(format!("  {}", l), styles::code_style())),
                );
                lines.push(Line::from(""));
            }
        }
    }

    if focused {
        if let Some(ref error) = app.error_message {
            lines.push(Line::from(Span::styled(error.clone(), styles::error_style())));
        }
    }

    let block = Block::default()
        .title(question.map(|q| format!(" {} ", q.title)).unwrap_or_default())
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
