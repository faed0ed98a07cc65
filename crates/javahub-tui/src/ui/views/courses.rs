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
    if app.courses.is_empty() {
        render_placeholder(frame, app, area, "Courses", "No courses yet. Press [a] to add one.");
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_course_list(frame, app, chunks[0]);
    render_course_detail(frame, app, chunks[1]);
}

fn render_course_list(frame: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app
        .courses
        .iter()
        .enumerate()
        .map(|(i, course)| {
            let style = if i == app.course_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(truncate_string(&course.title, width))).style(style)
        })
        .collect();

    let focused = app.focus == Focus::List;
    let block = Block::default()
        .title(format!(" Courses ({}) ", app.courses.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let mut state = ListState::default();
    state.select(Some(app.course_selection));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_course_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Detail;

    // Before a course is opened, preview what the list already knows
    let Some((ref course, ref lessons)) = app.course_detail else {
        let mut lines = Vec::new();
        if let Some(course) = app.selected_course() {
            if let Some(ref description) = course.description {
                lines.push(Line::from(description.clone()));
                lines.push(Line::from(""));
            }
            let hint = if focused && app.is_loading() {
                "Loading lessons..."
            } else {
                "Press Enter to view lessons"
            };
            lines.push(Line::from(Span::styled(hint, styles::muted_style())));
        }
        if focused {
            if let Some(ref error) = app.error_message {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(error.clone(), styles::error_style())));
            }
        }
        let title = app
            .selected_course()
            .map(|c| format!(" {} ", c.title))
            .unwrap_or_default();
        let block = Block::default()
            .title(title)
            .title_style(styles::title_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(focused));
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(5)])
        .split(area);

    // Lesson list
    let items: Vec<ListItem> = lessons
        .iter()
        .enumerate()
        .map(|(i, lesson)| {
            let style = if i == app.lesson_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(format!("{:>3}. {}", lesson.order_number, lesson.title)))
                .style(style)
        })
        .collect();

    let block = Block::default()
        .title(format!(" {}: {} lessons ", course.title, lessons.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    if items.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled("No lessons in this course", styles::muted_style()))
                .block(block),
            chunks[0],
        );
    } else {
        let mut state = ListState::default();
        state.select(Some(app.lesson_selection));
        frame.render_stateful_widget(List::new(items).block(block), chunks[0], &mut state);
    }

    // Lesson content
    let lesson = lessons.get(app.lesson_selection);
    let content: Vec<Line> = match lesson.and_then(|l| l.content.as_deref()) {
        Some(text) => text.lines().map(|l| Line::from(l.to_string())).collect(),
        None => vec![Line::from(Span::styled(
            course.description.clone().unwrap_or_default(),
            styles::muted_style(),
        ))],
    };
    let block = Block::default()
        .title(lesson.map(|l| format!(" {} ", l.title)).unwrap_or_default())
        .title_style(styles::highlight_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(content).block(block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}
