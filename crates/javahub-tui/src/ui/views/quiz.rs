use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use javahub_core::models::{AnswerOption, QuizResult};
use javahub_core::utils::truncate_string;

use crate::app::{App, QuizView};
use crate::ui::render::render_placeholder;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    match app.quiz.view {
        QuizView::Topics => render_topics(frame, app, area),
        QuizView::Questions => render_questions(frame, app, area),
        QuizView::Result => match app.quiz.result {
            Some(ref result) => render_result(frame, app, result, area),
            None => render_placeholder(frame, app, area, "Quiz result", "No result"),
        },
    }
}

fn render_topics(frame: &mut Frame, app: &App, area: Rect) {
    if app.quiz.topics.is_empty() {
        render_placeholder(frame, app, area, "Quiz", "No quiz questions available");
        return;
    }

    let items: Vec<ListItem> = app
        .quiz
        .topics
        .iter()
        .enumerate()
        .map(|(i, topic)| {
            let style = if i == app.quiz.topic_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let noun = if topic.count == 1 { "question" } else { "questions" };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<30}", truncate_string(&topic.topic, 30))),
                Span::styled(format!("{} {}", topic.count, noun), styles::muted_style()),
            ]))
            .style(style)
        })
        .collect();

    let block = Block::default()
        .title(" Choose a quiz topic ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let mut state = ListState::default();
    state.select(Some(app.quiz.topic_selection));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_questions(frame: &mut Frame, app: &App, area: Rect) {
    let topic = app.quiz.topic.as_deref().unwrap_or_default();
    if app.quiz.questions.is_empty() {
        render_placeholder(
            frame,
            app,
            area,
            &format!("Quiz: {}", topic),
            "No questions for this topic",
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(18), Constraint::Min(30)])
        .split(area);

    // Question index with answered markers
    let items: Vec<ListItem> = app
        .quiz
        .questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let marker = match app.quiz.answer_for(question.id) {
                Some(option) => format!("[{}]", option),
                None => "[ ]".to_string(),
            };
            let style = if i == app.quiz.question_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(format!("Q{:<3} {}", i + 1, marker))).style(style)
        })
        .collect();
    let block = Block::default()
        .title(format!(
            " {}/{} ",
            app.quiz.answers.len(),
            app.quiz.questions.len()
        ))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    let mut state = ListState::default();
    state.select(Some(app.quiz.question_selection));
    frame.render_stateful_widget(List::new(items).block(block), chunks[0], &mut state);

    // Current question
    let mut lines = Vec::new();
    if let Some(question) = app.quiz.current_question() {
        lines.push(Line::from(Span::styled(
            question.question.clone(),
            styles::title_style(),
        )));
        lines.push(Line::from(""));

        let chosen = app.quiz.answer_for(question.id);
        for option in AnswerOption::ALL {
            let Some(text) = question.option_text(option) else {
                continue;
            };
            let (marker, style) = if chosen == Some(option) {
                ("●", styles::selected_style())
            } else {
                ("○", styles::list_item_style())
            };
            lines.push(Line::styled(format!(" {} {}) {}", marker, option, text), style));
        }
    }

    if let Some(ref error) = app.error_message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), styles::error_style())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[a-d] choose  [←/→] question  [s] submit  [Esc] topics",
        styles::muted_style(),
    )));

    let block = Block::default()
        .title(format!(
            " {}: question {} of {} ",
            topic,
            app.quiz.question_selection + 1,
            app.quiz.questions.len()
        ))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}

fn render_result(frame: &mut Frame, app: &App, result: &QuizResult, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(area);

    let summary = vec![
        Line::from(vec![
            Span::styled("Score: ", styles::muted_style()),
            Span::styled(format!("{:.1}%", result.score), styles::score_style(result.band())),
        ]),
        Line::from(vec![
            Span::styled("Correct: ", styles::muted_style()),
            Span::raw(format!(
                "{} of {}",
                result.correct_answers, result.total_questions
            )),
        ]),
    ];
    let block = Block::default()
        .title(" Quiz result ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(summary).block(block), chunks[0]);

    // Per-question review, selected entry expanded
    let mut lines = Vec::new();
    for (i, item) in result.results.iter().enumerate() {
        let (mark, style) = if item.is_correct {
            ("✓", styles::success_style())
        } else {
            ("✗", styles::error_style())
        };
        let line_style = if i == app.quiz.result_selection {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", mark), style),
            Span::styled(item.question.clone(), line_style),
        ]));

        if i == app.quiz.result_selection {
            lines.push(Line::from(vec![
                Span::styled("    Your answer: ", styles::muted_style()),
                Span::raw(item.selected_option.clone().unwrap_or_else(|| "-".into())),
                Span::styled("   Correct: ", styles::muted_style()),
                Span::raw(item.correct_option.clone().unwrap_or_else(|| "-".into())),
            ]));
            if let Some(ref explanation) = item.explanation {
                lines.push(Line::styled(format!("    {}", explanation), styles::muted_style()));
            }
        }
    }

    let block = Block::default()
        .title(" Review  [Esc] back to topics ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}
