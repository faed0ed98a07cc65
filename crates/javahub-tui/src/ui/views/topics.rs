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
    if app.topic_groups.is_empty() {
        render_placeholder(frame, app, area, "Topics", "No topics available");
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_topic_list(frame, app, chunks[0]);
    render_topic_detail(frame, app, chunks[1]);
}

/// Category headers interleaved with their topics; the selection index only
/// counts topics, so track the list row separately.
fn render_topic_list(frame: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(6) as usize;
    let mut items = Vec::new();
    let mut selected_row = 0;
    let mut index = 0;

    for group in &app.topic_groups {
        items.push(ListItem::new(Line::from(Span::styled(
            format!("{} ({})", group.category, group.topics.len()),
            styles::highlight_style(),
        ))));
        for topic in &group.topics {
            let style = if index == app.topic_selection {
                selected_row = items.len();
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            items.push(
                ListItem::new(Line::from(format!("  {}", truncate_string(&topic.title, width))))
                    .style(style),
            );
            index += 1;
        }
    }

    let focused = app.focus == Focus::List;
    let block = Block::default()
        .title(format!(" Topics ({}) ", app.topic_count()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let mut state = ListState::default();
    state.select(Some(selected_row));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_topic_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Detail;

    // The opened topic, or the list entry while it loads
    let topic = app.topic_detail.as_ref().or_else(|| app.selected_topic());
    let mut lines = Vec::new();

    if let Some(topic) = topic {
        lines.push(Line::from(vec![
            Span::styled("Category: ", styles::muted_style()),
            Span::raw(topic.category().to_string()),
            Span::styled("   Difficulty: ", styles::muted_style()),
            Span::raw(topic.difficulty.clone().unwrap_or_else(|| "-".to_string())),
        ]));
        lines.push(Line::from(""));

        match (&app.topic_detail, topic.content.as_deref()) {
            (Some(_), Some(content)) => {
                lines.extend(content.lines().map(|l| Line::from(l.to_string())));
            }
            (Some(_), None) => {
                lines.push(Line::from(Span::styled("No content", styles::muted_style())));
            }
            (None, _) => {
                lines.push(Line::from(Span::styled(
                    "Press Enter to read this topic",
                    styles::muted_style(),
                )));
            }
        }
    }

    if focused {
        if let Some(ref error) = app.error_message {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(error.clone(), styles::error_style())));
        }
    }

    let block = Block::default()
        .title(topic.map(|t| format!(" {} ", t.title)).unwrap_or_default())
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
