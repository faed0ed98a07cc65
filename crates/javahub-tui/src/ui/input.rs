//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use javahub_core::models::AnswerOption;

use crate::app::{
    can_add_description_char, can_add_password_char, can_add_title_char, can_add_username_char,
    App, AppState, CourseFormFocus, LoginFocus, QuizView, RegisterFocus, Tab, PAGE_SCROLL_SIZE,
};

fn is_run_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::F(5))
        || (key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => return handle_login_input(app, key).await,
        AppState::Registering => {
            handle_register_input(app, key).await;
            return Ok(false);
        }
        AppState::AddingCourse => {
            handle_course_form_input(app, key);
            return Ok(false);
        }
        AppState::EditingCode => {
            handle_editor_input(app, key);
            return Ok(false);
        }
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.confirm_delete_course();
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    if is_run_key(&key) {
        if app.current_tab == Tab::Compiler {
            app.run_code();
        }
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char('L') => {
            app.logout();
        }
        KeyCode::Char(c @ '1'..='6') => {
            if let Some(tab) = Tab::from_digit(c) {
                app.navigate(tab);
            }
        }
        KeyCode::Left if in_quiz_questions(app) => app.move_selection(-1),
        KeyCode::Right if in_quiz_questions(app) => app.move_selection(1),
        KeyCode::Left => {
            let tab = app.current_tab.prev();
            app.navigate(tab);
        }
        KeyCode::Right => {
            let tab = app.current_tab.next();
            app.navigate(tab);
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => app.move_selection(PAGE_SCROLL_SIZE as isize),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),
        KeyCode::Enter => app.open_selected(),
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Esc => app.back(),
        _ => match app.current_tab {
            Tab::Courses => handle_courses_input(app, key),
            Tab::Quiz => handle_quiz_input(app, key),
            Tab::Compiler => handle_compiler_input(app, key),
            Tab::Dashboard | Tab::Topics | Tab::Practice => {
                if key.code == KeyCode::Char('r') {
                    app.refresh();
                }
            }
        },
    }

    Ok(false)
}

fn in_quiz_questions(app: &App) -> bool {
    app.current_tab == Tab::Quiz && app.quiz.view == QuizView::Questions
}

fn handle_courses_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('a') => app.start_add_course(),
        KeyCode::Char('d') => app.request_delete_course(),
        KeyCode::Char('r') => app.refresh(),
        _ => {}
    }
}

fn handle_quiz_input(app: &mut App, key: KeyEvent) {
    match (app.quiz.view, key.code) {
        (QuizView::Questions, KeyCode::Char('s')) => app.submit_quiz(),
        (QuizView::Questions, KeyCode::Char(c)) => {
            if let Some(option) = AnswerOption::from_char(c) {
                app.select_answer(option);
            }
        }
        (QuizView::Topics, KeyCode::Char('r')) => app.refresh(),
        _ => {}
    }
}

fn handle_compiler_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('e') | KeyCode::Char('i') => app.start_editing_code(),
        KeyCode::Char('c') => {
            app.code.clear();
            app.compile_result = None;
        }
        _ => {}
    }
}

fn handle_editor_input(app: &mut App, key: KeyEvent) {
    if is_run_key(&key) {
        app.run_code();
        return;
    }
    match key.code {
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Enter => app.insert_code_char('\n'),
        KeyCode::Tab => app.insert_code_indent(),
        KeyCode::Backspace => app.code_backspace(),
        KeyCode::Char(c) => app.insert_code_char(c),
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login().await,
            LoginFocus::Register => app.start_register(),
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button | LoginFocus::Register => {}
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
            LoginFocus::Button | LoginFocus::Register => {}
        },
        _ => {}
    }
    Ok(false)
}

async fn handle_register_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.start_login(),
        KeyCode::Down | KeyCode::Tab => {
            app.register_focus = app.register_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.register_focus = app.register_focus.prev();
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
            if app.register_focus == RegisterFocus::Role =>
        {
            app.toggle_register_role();
        }
        KeyCode::Enter => match app.register_focus {
            RegisterFocus::Username | RegisterFocus::Password | RegisterFocus::Role => {
                app.register_focus = app.register_focus.next();
            }
            RegisterFocus::Button => app.attempt_register().await,
            RegisterFocus::Back => app.start_login(),
        },
        KeyCode::Backspace => match app.register_focus {
            RegisterFocus::Username => {
                app.register_username.pop();
            }
            RegisterFocus::Password => {
                app.register_password.pop();
            }
            _ => {}
        },
        KeyCode::Char(c) => match app.register_focus {
            RegisterFocus::Username => {
                if can_add_username_char(app.register_username.chars().count(), c) {
                    app.register_username.push(c);
                }
            }
            RegisterFocus::Password => {
                if can_add_password_char(app.register_password.chars().count(), c) {
                    app.register_password.push(c);
                }
            }
            _ => {}
        },
        _ => {}
    }
}

fn handle_course_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Down | KeyCode::Tab => {
            app.course_form_focus = app.course_form_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.course_form_focus = app.course_form_focus.prev();
        }
        KeyCode::Enter => match app.course_form_focus {
            CourseFormFocus::Button => app.submit_course(),
            focus => app.course_form_focus = focus.next(),
        },
        KeyCode::Backspace => match app.course_form_focus {
            CourseFormFocus::Title => {
                app.course_form.title.pop();
            }
            CourseFormFocus::Description => {
                app.course_form.description.pop();
            }
            CourseFormFocus::Button => {}
        },
        KeyCode::Char(c) => match app.course_form_focus {
            CourseFormFocus::Title => {
                if can_add_title_char(app.course_form.title.chars().count(), c) {
                    app.course_form.title.push(c);
                }
            }
            CourseFormFocus::Description => {
                if can_add_description_char(app.course_form.description.chars().count(), c) {
                    app.course_form.description.push(c);
                }
            }
            CourseFormFocus::Button => {}
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use javahub_core::auth::{MemoryStore, SessionStore};
    use javahub_core::config::Config;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn anonymous_app() -> App {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        App::with_store(Config::default(), store).unwrap()
    }

    #[tokio::test]
    async fn test_login_typing_and_focus() {
        let mut app = anonymous_app();
        app.login_username.clear();
        app.login_password.clear();
        app.login_focus = LoginFocus::Username;

        for c in "bob".chars() {
            handle_input(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        handle_input(&mut app, key(KeyCode::Char('x'))).await.unwrap();
        handle_input(&mut app, key(KeyCode::Backspace)).await.unwrap();

        assert_eq!(app.login_username, "bob");
        assert!(app.login_password.is_empty());
        assert_eq!(app.login_focus, LoginFocus::Password);
    }

    #[tokio::test]
    async fn test_login_to_register_and_back() {
        let mut app = anonymous_app();
        app.login_focus = LoginFocus::Register;

        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.state, AppState::Registering);

        app.register_focus = RegisterFocus::Role;
        handle_input(&mut app, key(KeyCode::Right)).await.unwrap();
        assert_eq!(app.register_role.as_str(), "ADMIN");

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[tokio::test]
    async fn test_escape_on_login_quits() {
        let mut app = anonymous_app();
        assert!(handle_input(&mut app, key(KeyCode::Esc)).await.unwrap());
        assert_eq!(app.state, AppState::Quitting);
    }

    #[tokio::test]
    async fn test_editor_captures_letters() {
        let mut app = anonymous_app();
        app.state = AppState::EditingCode;

        for code in [KeyCode::Char('q'), KeyCode::Enter, KeyCode::Char('L')] {
            handle_input(&mut app, key(code)).await.unwrap();
        }
        assert_eq!(app.code, "q\nL");
        assert_eq!(app.state, AppState::EditingCode);

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.state, AppState::Normal);
    }

    #[test]
    fn test_run_key() {
        assert!(is_run_key(&key(KeyCode::F(5))));
        assert!(is_run_key(&KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL)));
        assert!(!is_run_key(&key(KeyCode::Char('r'))));
    }
}
