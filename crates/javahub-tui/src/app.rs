//! Application state management for javahub.
//!
//! This module contains the core `App` struct: view state, form state, the
//! API client, and the channel that brings background fetch results (and the
//! session guard's redirect) back to the event loop.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use javahub_core::api::{ApiClient, ApiError, ErrorKind};
use javahub_core::auth::{Navigator, Role, SessionGuard, SessionState, SessionStore};
use javahub_core::config::Config;
use javahub_core::models::{
    count_by_topic, group_by_category, AnswerOption, CompileResult, Course, CourseContent,
    Dashboard, NewCourse, PracticeQuestion, QuizQuestion, QuizResult, QuizSubmission, QuizTopic,
    Topic, TopicGroup, ALL_TOPICS,
};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

const MAX_TITLE_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Upper bound on the compiler buffer
const MAX_CODE_LENGTH: usize = 20_000;

/// Spaces inserted for Tab in the code editor
const INDENT: &str = "    ";

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

pub const USERNAME_ENV: &str = "JAVAHUB_USERNAME";
pub const PASSWORD_ENV: &str = "JAVAHUB_PASSWORD";

pub const MISSING_CREDENTIALS_MESSAGE: &str = "Please enter both username and password";
pub const MISSING_COURSE_FIELDS_MESSAGE: &str = "Please fill in both title and description";
pub const EMPTY_QUIZ_MESSAGE: &str = "Please answer at least one question before submitting.";
pub const EMPTY_CODE_MESSAGE: &str = "Please enter some Java code to run";
pub const REGISTERED_MESSAGE: &str = "Registration successful. Please login.";

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Courses,
    Topics,
    Practice,
    Quiz,
    Compiler,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::Courses,
        Tab::Topics,
        Tab::Practice,
        Tab::Quiz,
        Tab::Compiler,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Courses => "Courses",
            Tab::Topics => "Topics",
            Tab::Practice => "Practice",
            Tab::Quiz => "Quiz",
            Tab::Compiler => "Compiler",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Courses,
            Tab::Courses => Tab::Topics,
            Tab::Topics => Tab::Practice,
            Tab::Practice => Tab::Quiz,
            Tab::Quiz => Tab::Compiler,
            Tab::Compiler => Tab::Dashboard,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Compiler,
            Tab::Courses => Tab::Dashboard,
            Tab::Topics => Tab::Courses,
            Tab::Practice => Tab::Topics,
            Tab::Quiz => Tab::Practice,
            Tab::Compiler => Tab::Quiz,
        }
    }

    /// Tab for a number key ('1'..='6')
    pub fn from_digit(c: char) -> Option<Self> {
        let index = c.to_digit(10)? as usize;
        Self::ALL.get(index.checked_sub(1)?).copied()
    }
}

/// Current UI focus area (list panel or detail panel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    LoggingIn,
    Registering,
    AddingCourse,
    ConfirmingDelete,
    EditingCode,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
    Register,
}

impl LoginFocus {
    pub fn next(self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Register,
            LoginFocus::Register => LoginFocus::Username,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Register,
            LoginFocus::Password => LoginFocus::Username,
            LoginFocus::Button => LoginFocus::Password,
            LoginFocus::Register => LoginFocus::Button,
        }
    }
}

/// Register form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterFocus {
    Username,
    Password,
    Role,
    Button,
    Back,
}

impl RegisterFocus {
    pub fn next(self) -> Self {
        match self {
            RegisterFocus::Username => RegisterFocus::Password,
            RegisterFocus::Password => RegisterFocus::Role,
            RegisterFocus::Role => RegisterFocus::Button,
            RegisterFocus::Button => RegisterFocus::Back,
            RegisterFocus::Back => RegisterFocus::Username,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            RegisterFocus::Username => RegisterFocus::Back,
            RegisterFocus::Password => RegisterFocus::Username,
            RegisterFocus::Role => RegisterFocus::Password,
            RegisterFocus::Button => RegisterFocus::Role,
            RegisterFocus::Back => RegisterFocus::Button,
        }
    }
}

/// Add-course form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseFormFocus {
    Title,
    Description,
    Button,
}

impl CourseFormFocus {
    pub fn next(self) -> Self {
        match self {
            CourseFormFocus::Title => CourseFormFocus::Description,
            CourseFormFocus::Description => CourseFormFocus::Button,
            CourseFormFocus::Button => CourseFormFocus::Title,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            CourseFormFocus::Title => CourseFormFocus::Button,
            CourseFormFocus::Description => CourseFormFocus::Title,
            CourseFormFocus::Button => CourseFormFocus::Description,
        }
    }
}

/// Which page of the quiz tab is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizView {
    Topics,
    Questions,
    Result,
}

/// Quiz tab state: topic list, the running quiz, and its result
#[derive(Debug, Clone)]
pub struct QuizState {
    pub view: QuizView,
    /// Topic entries, "All" first
    pub topics: Vec<QuizTopic>,
    pub topic_selection: usize,
    pub topic: Option<String>,
    pub questions: Vec<QuizQuestion>,
    pub question_selection: usize,
    pub answers: HashMap<i64, AnswerOption>,
    pub result: Option<QuizResult>,
    pub result_selection: usize,
}

impl Default for QuizState {
    fn default() -> Self {
        Self {
            view: QuizView::Topics,
            topics: Vec::new(),
            topic_selection: 0,
            topic: None,
            questions: Vec::new(),
            question_selection: 0,
            answers: HashMap::new(),
            result: None,
            result_selection: 0,
        }
    }
}

impl QuizState {
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.question_selection)
    }

    pub fn answer_for(&self, question_id: i64) -> Option<AnswerOption> {
        self.answers.get(&question_id).copied()
    }

    pub fn submission(&self) -> QuizSubmission {
        QuizSubmission::from_answers(self.answers.iter().map(|(id, option)| (*id, *option)))
    }
}

// ============================================================================
// Background Task Messages
// ============================================================================

/// Data produced by a background request.
#[derive(Debug)]
pub enum Payload {
    Dashboard(Dashboard),
    Courses(Vec<Course>),
    CourseDetails(Course, Vec<CourseContent>),
    CourseCreated(Course),
    CourseDeleted(i64),
    Topics(Vec<Topic>),
    Topic(Topic),
    PracticeQuestions(Vec<PracticeQuestion>),
    PracticeQuestion(PracticeQuestion),
    /// Every question, used to build the topic list
    QuizCatalog(Vec<QuizQuestion>),
    QuizQuestions(Vec<QuizQuestion>),
    QuizResult(QuizResult),
    Compiled(CompileResult),
}

/// Messages delivered to the event loop.
///
/// Request results carry the view generation they were issued under; the app
/// drops any result whose generation is no longer current.
#[derive(Debug)]
pub enum AppMessage {
    Loaded {
        generation: u64,
        payload: Payload,
    },
    Failed {
        generation: u64,
        what: &'static str,
        error: ApiError,
    },
    /// The session guard wants the login view
    RedirectToLogin,
}

/// Delivers the guard's redirect to the event loop.
///
/// The guard calls this from a timer task, so the send has to be
/// non-blocking; the channel is unbounded for that reason.
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<AppMessage>,
}

impl Navigator for ChannelNavigator {
    fn to_entry_point(&self) {
        if self.tx.send(AppMessage::RedirectToLogin).is_err() {
            debug!("Event loop gone, dropping redirect");
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub api: ApiClient,
    /// Re-derived from the store after every credential change and every
    /// processed message. Never set directly.
    pub session_state: SessionState,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub focus: Focus,
    generation: u64,
    pending_requests: usize,
    pub status_message: Option<String>,
    pub error_message: Option<String>,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    pub login_notice: Option<String>,

    // Register form state
    pub register_username: String,
    pub register_password: String,
    pub register_role: Role,
    pub register_focus: RegisterFocus,
    pub register_error: Option<String>,

    // Dashboard
    pub dashboard: Option<Dashboard>,

    // Courses
    pub courses: Vec<Course>,
    pub course_selection: usize,
    pub course_detail: Option<(Course, Vec<CourseContent>)>,
    pub lesson_selection: usize,
    pub course_form: NewCourse,
    pub course_form_focus: CourseFormFocus,
    pub course_form_error: Option<String>,

    // Topics
    pub topic_groups: Vec<TopicGroup>,
    pub topic_selection: usize,
    pub topic_detail: Option<Topic>,

    // Practice
    pub practice_questions: Vec<PracticeQuestion>,
    pub practice_selection: usize,
    pub practice_detail: Option<PracticeQuestion>,

    pub quiz: QuizState,

    // Compiler
    pub code: String,
    pub compile_result: Option<CompileResult>,

    // Background task channel
    tx: mpsc::UnboundedSender<AppMessage>,
    rx: mpsc::UnboundedReceiver<AppMessage>,
}

impl App {
    /// Create the application with the session backend chosen in `config`
    pub fn new(config: Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let store = SessionStore::open(config.storage, &data_dir);
        debug!(?data_dir, storage = ?config.storage, "Session store opened");
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: SessionStore) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let navigator = Arc::new(ChannelNavigator { tx: tx.clone() });
        let guard = SessionGuard::new(store, navigator);
        let api = ApiClient::with_timeout(config.api_base_url(), guard, config.request_timeout())
            .context("Failed to create API client")?;
        let session_state = api.guard().session_state();
        debug!(base_url = api.base_url(), authenticated = session_state.is_authenticated(), "App created");

        let login_username = std::env::var(USERNAME_ENV)
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();
        let login_password = std::env::var(PASSWORD_ENV).unwrap_or_default();

        let mut app = Self {
            config,
            api,
            session_state,

            state: AppState::Normal,
            current_tab: Tab::Dashboard,
            focus: Focus::List,
            generation: 0,
            pending_requests: 0,
            status_message: None,
            error_message: None,

            login_username,
            login_password,
            login_focus: LoginFocus::Username,
            login_error: None,
            login_notice: None,

            register_username: String::new(),
            register_password: String::new(),
            register_role: Role::User,
            register_focus: RegisterFocus::Username,
            register_error: None,

            dashboard: None,

            courses: Vec::new(),
            course_selection: 0,
            course_detail: None,
            lesson_selection: 0,
            course_form: NewCourse::default(),
            course_form_focus: CourseFormFocus::Title,
            course_form_error: None,

            topic_groups: Vec::new(),
            topic_selection: 0,
            topic_detail: None,

            practice_questions: Vec::new(),
            practice_selection: 0,
            practice_detail: None,

            quiz: QuizState::default(),

            code: String::new(),
            compile_result: None,

            tx,
            rx,
        };

        if !app.is_authenticated() {
            app.start_login();
        }
        Ok(app)
    }

    pub fn is_loading(&self) -> bool {
        self.pending_requests > 0
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.session_state.is_authenticated()
    }

    fn refresh_session_state(&mut self) {
        self.session_state = self.api.guard().session_state();
    }

    /// Show the login view
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) {
        let username = self.login_username.trim().to_string();
        let password = self.login_password.clone();

        if username.is_empty() || password.is_empty() {
            self.login_error = Some(MISSING_CREDENTIALS_MESSAGE.to_string());
            return;
        }

        self.login_error = None;
        self.login_notice = None;

        match self.api.login(&username, &password).await {
            Ok(credential) => {
                self.config.last_username = Some(credential.username.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                self.login_password.clear();
                self.refresh_session_state();
                self.reset_views();
                self.state = AppState::Normal;
                self.navigate(Tab::Dashboard);
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(e.user_message());
                self.refresh_session_state();
            }
        }
    }

    pub fn start_register(&mut self) {
        self.state = AppState::Registering;
        self.register_focus = RegisterFocus::Username;
        self.register_error = None;
    }

    pub fn toggle_register_role(&mut self) {
        self.register_role = match self.register_role {
            Role::Admin => Role::User,
            _ => Role::Admin,
        };
    }

    pub async fn attempt_register(&mut self) {
        let username = self.register_username.trim().to_string();
        let password = self.register_password.clone();

        if username.is_empty() || password.is_empty() {
            self.register_error = Some(MISSING_CREDENTIALS_MESSAGE.to_string());
            return;
        }

        self.register_error = None;

        match self
            .api
            .register(&username, &password, &self.register_role)
            .await
        {
            Ok(()) => {
                self.login_username = username;
                self.login_password.clear();
                self.register_username.clear();
                self.register_password.clear();
                self.register_role = Role::User;
                self.start_login();
                self.login_notice = Some(REGISTERED_MESSAGE.to_string());
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                self.register_error = Some(e.user_message());
            }
        }
    }

    /// Explicit logout: the guard clears the session and navigates right away
    pub fn logout(&mut self) {
        self.api.guard().logout();
        self.refresh_session_state();
        self.show_entry_point();
        self.status_message = Some("Logged out".to_string());
    }

    /// The entry point: re-derive the session and, without one, show login
    fn show_entry_point(&mut self) {
        self.refresh_session_state();
        if self.is_authenticated() {
            debug!("Redirect ignored, a session exists again");
            return;
        }
        if matches!(self.state, AppState::LoggingIn | AppState::Registering) {
            return;
        }
        self.reset_views();
        self.start_login();
    }

    /// Drop everything fetched for the previous session
    fn reset_views(&mut self) {
        self.bump_generation();
        self.current_tab = Tab::Dashboard;
        self.focus = Focus::List;
        self.error_message = None;
        self.dashboard = None;
        self.courses.clear();
        self.course_selection = 0;
        self.course_detail = None;
        self.lesson_selection = 0;
        self.topic_groups.clear();
        self.topic_selection = 0;
        self.topic_detail = None;
        self.practice_questions.clear();
        self.practice_selection = 0;
        self.practice_detail = None;
        self.quiz = QuizState::default();
        self.compile_result = None;
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Start a new view generation; results for older views are dropped
    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.pending_requests = 0;
    }

    /// Switch tab and load its data
    pub fn navigate(&mut self, tab: Tab) {
        self.bump_generation();
        self.current_tab = tab;
        self.focus = Focus::List;
        self.error_message = None;
        self.course_detail = None;
        self.topic_detail = None;
        self.practice_detail = None;
        if tab == Tab::Quiz {
            self.quiz.view = QuizView::Topics;
        }
        self.load_current_tab();
    }

    /// Fetch the list data behind the current tab
    pub fn load_current_tab(&mut self) {
        let api = self.api.clone();
        match self.current_tab {
            Tab::Dashboard => self.spawn_request("dashboard", async move {
                api.fetch_dashboard().await.map(Payload::Dashboard)
            }),
            Tab::Courses => self.spawn_request("courses", async move {
                api.fetch_courses().await.map(Payload::Courses)
            }),
            Tab::Topics => self.spawn_request("topics", async move {
                api.fetch_topics().await.map(Payload::Topics)
            }),
            Tab::Practice => self.spawn_request("practice questions", async move {
                api.fetch_practice_questions()
                    .await
                    .map(Payload::PracticeQuestions)
            }),
            Tab::Quiz => self.spawn_request("quiz topics", async move {
                api.fetch_quiz_questions().await.map(Payload::QuizCatalog)
            }),
            Tab::Compiler => {}
        }
    }

    /// Reload whatever the current view shows
    pub fn refresh(&mut self) {
        match (self.current_tab, self.focus) {
            (Tab::Courses, Focus::Detail) | (Tab::Topics, Focus::Detail) | (Tab::Practice, Focus::Detail) => {
                self.open_selected()
            }
            (Tab::Quiz, _) if self.quiz.view != QuizView::Topics => {}
            _ => self.load_current_tab(),
        }
    }

    /// Enter: drill into the selected item
    pub fn open_selected(&mut self) {
        let api = self.api.clone();
        match self.current_tab {
            Tab::Courses => {
                let Some(id) = self.courses.get(self.course_selection).map(|c| c.id) else {
                    return;
                };
                self.bump_generation();
                self.focus = Focus::Detail;
                self.lesson_selection = 0;
                self.spawn_request("course details", async move {
                    api.fetch_course_details(id)
                        .await
                        .map(|(course, lessons)| Payload::CourseDetails(course, lessons))
                });
            }
            Tab::Topics => {
                let Some(id) = self.selected_topic().map(|t| t.id) else {
                    return;
                };
                self.bump_generation();
                self.focus = Focus::Detail;
                self.spawn_request("topic", async move {
                    api.fetch_topic(id).await.map(Payload::Topic)
                });
            }
            Tab::Practice => {
                let Some(id) = self.practice_questions.get(self.practice_selection).map(|q| q.id) else {
                    return;
                };
                self.bump_generation();
                self.focus = Focus::Detail;
                self.spawn_request("practice question", async move {
                    api.fetch_practice_question(id)
                        .await
                        .map(Payload::PracticeQuestion)
                });
            }
            Tab::Quiz if self.quiz.view == QuizView::Topics => self.start_quiz(),
            Tab::Dashboard | Tab::Quiz | Tab::Compiler => {}
        }
    }

    /// Esc: leave the current sub-view
    pub fn back(&mut self) {
        match self.current_tab {
            Tab::Quiz if self.quiz.view != QuizView::Topics => {
                self.bump_generation();
                self.quiz.view = QuizView::Topics;
                self.quiz.result = None;
            }
            _ if self.focus == Focus::Detail => {
                self.bump_generation();
                self.focus = Focus::List;
                self.course_detail = None;
                self.topic_detail = None;
                self.practice_detail = None;
            }
            _ => {
                self.error_message = None;
            }
        }
    }

    /// Mutable selection index and length of the list the arrows move through
    fn active_list(&mut self) -> Option<(&mut usize, usize)> {
        match (self.current_tab, self.focus) {
            (Tab::Courses, Focus::List) => {
                let len = self.courses.len();
                Some((&mut self.course_selection, len))
            }
            (Tab::Courses, Focus::Detail) => {
                let len = self.course_detail.as_ref().map_or(0, |(_, lessons)| lessons.len());
                Some((&mut self.lesson_selection, len))
            }
            (Tab::Topics, Focus::List) => {
                let len = self.topic_count();
                Some((&mut self.topic_selection, len))
            }
            (Tab::Practice, Focus::List) => {
                let len = self.practice_questions.len();
                Some((&mut self.practice_selection, len))
            }
            (Tab::Quiz, _) => match self.quiz.view {
                QuizView::Topics => {
                    let len = self.quiz.topics.len();
                    Some((&mut self.quiz.topic_selection, len))
                }
                QuizView::Questions => {
                    let len = self.quiz.questions.len();
                    Some((&mut self.quiz.question_selection, len))
                }
                QuizView::Result => {
                    let len = self.quiz.result.as_ref().map_or(0, |r| r.results.len());
                    Some((&mut self.quiz.result_selection, len))
                }
            },
            _ => None,
        }
    }

    /// Move the active selection by `delta`, clamped to the list
    pub fn move_selection(&mut self, delta: isize) {
        if let Some((selection, len)) = self.active_list() {
            *selection = if len == 0 {
                0
            } else {
                selection.saturating_add_signed(delta).min(len - 1)
            };
        }
    }

    pub fn select_first(&mut self) {
        if let Some((selection, _)) = self.active_list() {
            *selection = 0;
        }
    }

    pub fn select_last(&mut self) {
        if let Some((selection, len)) = self.active_list() {
            *selection = len.saturating_sub(1);
        }
    }

    pub fn toggle_focus(&mut self) {
        match (self.current_tab, self.focus) {
            (Tab::Courses | Tab::Topics | Tab::Practice, Focus::List) => self.open_selected(),
            (_, Focus::Detail) => self.back(),
            _ => {}
        }
    }

    // =========================================================================
    // Topics
    // =========================================================================

    pub fn topic_count(&self) -> usize {
        self.topic_groups.iter().map(|g| g.topics.len()).sum()
    }

    /// The selected topic, counting through the groups in display order
    pub fn selected_topic(&self) -> Option<&Topic> {
        self.topic_groups
            .iter()
            .flat_map(|g| g.topics.iter())
            .nth(self.topic_selection)
    }

    // =========================================================================
    // Courses
    // =========================================================================

    pub fn start_add_course(&mut self) {
        self.course_form = NewCourse::default();
        self.course_form_focus = CourseFormFocus::Title;
        self.course_form_error = None;
        self.state = AppState::AddingCourse;
    }

    pub fn submit_course(&mut self) {
        if !self.course_form.is_complete() {
            self.course_form_error = Some(MISSING_COURSE_FIELDS_MESSAGE.to_string());
            return;
        }

        let course = NewCourse {
            title: self.course_form.title.trim().to_string(),
            description: self.course_form.description.trim().to_string(),
        };
        self.state = AppState::Normal;
        self.course_form_error = None;

        let api = self.api.clone();
        self.spawn_request("new course", async move {
            api.create_course(&course).await.map(Payload::CourseCreated)
        });
    }

    pub fn selected_course(&self) -> Option<&Course> {
        self.courses.get(self.course_selection)
    }

    pub fn request_delete_course(&mut self) {
        if self.focus == Focus::List && self.selected_course().is_some() {
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub fn confirm_delete_course(&mut self) {
        self.state = AppState::Normal;
        let Some(id) = self.selected_course().map(|c| c.id) else {
            return;
        };
        let api = self.api.clone();
        self.spawn_request("course deletion", async move {
            api.delete_course(id).await.map(|()| Payload::CourseDeleted(id))
        });
    }

    // =========================================================================
    // Quiz
    // =========================================================================

    /// Load the questions for the selected topic
    pub fn start_quiz(&mut self) {
        let Some(topic) = self
            .quiz
            .topics
            .get(self.quiz.topic_selection)
            .map(|t| t.topic.clone())
        else {
            return;
        };

        self.bump_generation();
        self.quiz.view = QuizView::Questions;
        self.quiz.topic = Some(topic.clone());
        self.quiz.questions.clear();
        self.quiz.question_selection = 0;
        self.quiz.answers.clear();
        self.quiz.result = None;
        self.error_message = None;

        let api = self.api.clone();
        self.spawn_request("quiz questions", async move {
            api.fetch_quiz_questions_for(&topic)
                .await
                .map(Payload::QuizQuestions)
        });
    }

    pub fn select_answer(&mut self, option: AnswerOption) {
        if let Some(id) = self.quiz.current_question().map(|q| q.id) {
            self.quiz.answers.insert(id, option);
            self.error_message = None;
        }
    }

    pub fn submit_quiz(&mut self) {
        let submission = self.quiz.submission();
        if submission.is_empty() {
            self.error_message = Some(EMPTY_QUIZ_MESSAGE.to_string());
            return;
        }

        let api = self.api.clone();
        self.spawn_request("quiz submission", async move {
            api.submit_quiz(&submission).await.map(Payload::QuizResult)
        });
    }

    // =========================================================================
    // Compiler
    // =========================================================================

    pub fn start_editing_code(&mut self) {
        self.state = AppState::EditingCode;
    }

    pub fn insert_code_char(&mut self, c: char) {
        if self.code.len() < MAX_CODE_LENGTH && (c == '\n' || !c.is_control()) {
            self.code.push(c);
        }
    }

    pub fn insert_code_indent(&mut self) {
        if self.code.len() + INDENT.len() <= MAX_CODE_LENGTH {
            self.code.push_str(INDENT);
        }
    }

    pub fn code_backspace(&mut self) {
        self.code.pop();
    }

    pub fn run_code(&mut self) {
        if self.code.trim().is_empty() {
            self.error_message = Some(EMPTY_CODE_MESSAGE.to_string());
            return;
        }

        self.compile_result = None;
        let api = self.api.clone();
        let code = self.code.clone();
        self.spawn_request("compiler", async move {
            api.run_code(&code).await.map(Payload::Compiled)
        });
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    /// Run `request` on a background task and deliver its result, tagged with
    /// the current view generation.
    fn spawn_request<F>(&mut self, what: &'static str, request: F)
    where
        F: Future<Output = Result<Payload, ApiError>> + Send + 'static,
    {
        let tx = self.tx.clone();
        let generation = self.generation;
        self.pending_requests += 1;
        self.error_message = None;
        debug!(what, generation, "Request started");

        tokio::spawn(async move {
            let message = match request.await {
                Ok(payload) => AppMessage::Loaded { generation, payload },
                Err(error) => AppMessage::Failed {
                    generation,
                    what,
                    error,
                },
            };
            if tx.send(message).is_err() {
                debug!(what, "Event loop gone, dropping result");
            }
        });
    }

    /// Process every message that has arrived since the last call
    pub fn check_background_tasks(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.process_message(message);
            self.refresh_session_state();
        }
    }

    fn process_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::RedirectToLogin => {
                info!("Redirect to login received");
                self.show_entry_point();
            }
            AppMessage::Loaded { generation, payload } => {
                if !self.is_current(generation) {
                    debug!(generation, current = self.generation, "Dropping stale result");
                    return;
                }
                self.pending_requests = self.pending_requests.saturating_sub(1);
                self.apply_payload(payload);
            }
            AppMessage::Failed {
                generation,
                what,
                error,
            } => {
                match error.kind() {
                    ErrorKind::Authorization => warn!(what, "Request rejected, session cleared"),
                    ErrorKind::Transport | ErrorKind::Application => {
                        error!(what, error = %error, "Request failed")
                    }
                }
                if !self.is_current(generation) {
                    debug!(generation, current = self.generation, "Dropping stale failure");
                    return;
                }
                self.pending_requests = self.pending_requests.saturating_sub(1);
                self.error_message = Some(error.user_message());
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    fn apply_payload(&mut self, payload: Payload) {
        match payload {
            Payload::Dashboard(data) => {
                self.dashboard = Some(data);
            }
            Payload::Courses(data) => {
                self.course_selection = self.course_selection.min(data.len().saturating_sub(1));
                self.courses = data;
            }
            Payload::CourseDetails(course, lessons) => {
                self.course_detail = Some((course, lessons));
            }
            Payload::CourseCreated(course) => {
                self.status_message = Some(format!("Added course \"{}\"", course.title));
                self.courses.push(course);
                self.course_selection = self.courses.len() - 1;
            }
            Payload::CourseDeleted(id) => {
                self.courses.retain(|c| c.id != id);
                self.course_selection = self.course_selection.min(self.courses.len().saturating_sub(1));
                self.status_message = Some("Course deleted".to_string());
            }
            Payload::Topics(data) => {
                self.topic_groups = group_by_category(&data);
                self.topic_selection = self.topic_selection.min(data.len().saturating_sub(1));
            }
            Payload::Topic(topic) => {
                self.topic_detail = Some(topic);
            }
            Payload::PracticeQuestions(data) => {
                self.practice_selection = self.practice_selection.min(data.len().saturating_sub(1));
                self.practice_questions = data;
            }
            Payload::PracticeQuestion(question) => {
                self.practice_detail = Some(question);
            }
            Payload::QuizCatalog(questions) => {
                let mut topics = vec![QuizTopic {
                    topic: ALL_TOPICS.to_string(),
                    count: questions.len(),
                }];
                topics.extend(count_by_topic(&questions));
                self.quiz.topic_selection = self.quiz.topic_selection.min(topics.len() - 1);
                self.quiz.topics = topics;
            }
            Payload::QuizQuestions(questions) => {
                self.quiz.questions = questions;
                self.quiz.question_selection = 0;
            }
            Payload::QuizResult(result) => {
                info!(score = result.score, "Quiz submitted");
                self.quiz.result = Some(result);
                self.quiz.result_selection = 0;
                self.quiz.view = QuizView::Result;
            }
            Payload::Compiled(result) => {
                self.compile_result = Some(result);
            }
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

pub fn can_add_title_char(current_len: usize, c: char) -> bool {
    current_len < MAX_TITLE_LENGTH && is_valid_input_char(c)
}

pub fn can_add_description_char(current_len: usize, c: char) -> bool {
    current_len < MAX_DESCRIPTION_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use javahub_core::api::UNREACHABLE_MESSAGE;
    use javahub_core::auth::{Credential, MemoryStore, AUTH_FAILURE_MESSAGE};
    use pretty_assertions::assert_eq;

    fn app_with(storage: MemoryStore) -> App {
        let store = SessionStore::new(Arc::new(storage));
        App::with_store(Config::default(), store).unwrap()
    }

    fn logged_in_app() -> App {
        app_with(MemoryStore::with_entries([
            ("authToken", "abc"),
            ("username", "alice"),
            ("role", "USER"),
        ]))
    }

    fn question(id: i64, topic: &str) -> QuizQuestion {
        QuizQuestion {
            id,
            question: format!("Q{}", id),
            option_a: Some("a".into()),
            option_b: Some("b".into()),
            option_c: Some("c".into()),
            option_d: Some("d".into()),
            correct_option: None,
            explanation: None,
            topic: Some(topic.into()),
        }
    }

    // -------------------------------------------------------------------------
    // Startup
    // -------------------------------------------------------------------------

    #[test]
    fn test_empty_store_starts_at_login() {
        let app = app_with(MemoryStore::new());
        assert_eq!(app.session_state, SessionState::Anonymous);
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[test]
    fn test_stored_credential_resumes_session() {
        let app = logged_in_app();
        assert_eq!(
            app.session_state,
            SessionState::Authenticated {
                username: "alice".into(),
                role: Role::User,
            }
        );
        assert_eq!(app.state, AppState::Normal);
    }

    #[test]
    fn test_legacy_token_resumes_session() {
        let app = app_with(MemoryStore::with_entries([("token", "old"), ("username", "bob")]));
        assert!(app.is_authenticated());
    }

    #[test]
    fn test_token_without_username_is_anonymous() {
        let app = app_with(MemoryStore::with_entries([("authToken", "abc")]));
        assert_eq!(app.state, AppState::LoggingIn);
    }

    // -------------------------------------------------------------------------
    // Redirects
    // -------------------------------------------------------------------------

    #[test]
    fn test_redirect_shows_login_once_store_is_empty() {
        let mut app = logged_in_app();
        app.courses.push(Course {
            id: 1,
            title: "Java Basics".into(),
            description: None,
        });

        app.api.guard().clear_credential().unwrap();
        app.tx.send(AppMessage::RedirectToLogin).unwrap();
        app.check_background_tasks();

        assert_eq!(app.session_state, SessionState::Anonymous);
        assert_eq!(app.state, AppState::LoggingIn);
        assert!(app.courses.is_empty());
    }

    #[test]
    fn test_redirect_ignored_after_new_login() {
        let mut app = logged_in_app();
        app.api
            .guard()
            .set_credential(&Credential::new("new", "carol", Role::Admin))
            .unwrap();
        app.tx.send(AppMessage::RedirectToLogin).unwrap();
        app.check_background_tasks();

        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.session_state.username(), Some("carol"));
    }

    #[test]
    fn test_logout_clears_and_shows_login() {
        let storage = MemoryStore::with_entries([("authToken", "abc"), ("username", "alice")]);
        let mut app = app_with(storage.clone());

        app.logout();
        assert!(storage.is_empty());
        assert_eq!(app.state, AppState::LoggingIn);

        // The navigator's own message is harmless on the login screen
        app.check_background_tasks();
        assert_eq!(app.state, AppState::LoggingIn);
    }

    // -------------------------------------------------------------------------
    // Background results
    // -------------------------------------------------------------------------

    #[test]
    fn test_stale_result_is_dropped() {
        let mut app = logged_in_app();
        let old = app.generation;
        app.bump_generation();

        app.tx
            .send(AppMessage::Loaded {
                generation: old,
                payload: Payload::Dashboard(Dashboard {
                    quizzes_taken: 9,
                    ..Default::default()
                }),
            })
            .unwrap();
        app.check_background_tasks();
        assert_eq!(app.dashboard, None);

        app.tx
            .send(AppMessage::Loaded {
                generation: app.generation,
                payload: Payload::Dashboard(Dashboard::default()),
            })
            .unwrap();
        app.check_background_tasks();
        assert_eq!(app.dashboard, Some(Dashboard::default()));
    }

    #[test]
    fn test_failures_surface_user_message() {
        let mut app = logged_in_app();
        app.tx
            .send(AppMessage::Failed {
                generation: app.generation,
                what: "courses",
                error: ApiError::InvalidResponse("bad json".into()),
            })
            .unwrap();
        app.check_background_tasks();
        assert_eq!(app.error_message.as_deref(), Some(UNREACHABLE_MESSAGE));
        assert!(app.is_authenticated());

        app.api.guard().clear_credential().unwrap();
        app.tx
            .send(AppMessage::Failed {
                generation: app.generation,
                what: "courses",
                error: ApiError::SessionExpired(AUTH_FAILURE_MESSAGE.into()),
            })
            .unwrap();
        app.check_background_tasks();
        assert_eq!(app.error_message.as_deref(), Some(AUTH_FAILURE_MESSAGE));
        assert_eq!(app.session_state, SessionState::Anonymous);
    }

    #[test]
    fn test_quiz_catalog_lists_all_first() {
        let mut app = logged_in_app();
        app.tx
            .send(AppMessage::Loaded {
                generation: app.generation,
                payload: Payload::QuizCatalog(vec![
                    question(1, "Loops"),
                    question(2, "OOP"),
                    question(3, "Loops"),
                ]),
            })
            .unwrap();
        app.check_background_tasks();

        let topics: Vec<(&str, usize)> = app
            .quiz
            .topics
            .iter()
            .map(|t| (t.topic.as_str(), t.count))
            .collect();
        assert_eq!(topics, vec![("All", 3), ("Loops", 2), ("OOP", 1)]);
    }

    #[test]
    fn test_topics_selected_in_group_order() {
        let mut app = logged_in_app();
        let topic = |id: i64, category: &str| Topic {
            id,
            title: format!("T{}", id),
            content: None,
            difficulty: None,
            category: Some(category.into()),
        };
        app.tx
            .send(AppMessage::Loaded {
                generation: app.generation,
                payload: Payload::Topics(vec![topic(1, "Basics"), topic(2, "OOP"), topic(3, "Basics")]),
            })
            .unwrap();
        app.check_background_tasks();

        app.current_tab = Tab::Topics;
        app.move_selection(1);
        assert_eq!(app.selected_topic().map(|t| t.id), Some(3));
        app.move_selection(10);
        assert_eq!(app.selected_topic().map(|t| t.id), Some(2));
        app.move_selection(-10);
        assert_eq!(app.selected_topic().map(|t| t.id), Some(1));
    }

    // -------------------------------------------------------------------------
    // Form validation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let mut app = app_with(MemoryStore::new());
        app.login_username = "alice".into();
        app.login_password.clear();

        app.attempt_login().await;
        assert_eq!(app.login_error.as_deref(), Some(MISSING_CREDENTIALS_MESSAGE));
        assert_eq!(app.state, AppState::LoggingIn);
    }

    #[tokio::test]
    async fn test_register_requires_both_fields() {
        let mut app = app_with(MemoryStore::new());
        app.start_register();
        app.register_username = "   ".into();
        app.register_password = "pw".into();

        app.attempt_register().await;
        assert_eq!(app.register_error.as_deref(), Some(MISSING_CREDENTIALS_MESSAGE));
        assert_eq!(app.state, AppState::Registering);
    }

    #[test]
    fn test_course_form_requires_both_fields() {
        let mut app = logged_in_app();
        app.start_add_course();
        app.course_form.title = "Streams".into();

        app.submit_course();
        assert_eq!(app.course_form_error.as_deref(), Some(MISSING_COURSE_FIELDS_MESSAGE));
        assert_eq!(app.state, AppState::AddingCourse);
    }

    #[test]
    fn test_quiz_submit_requires_an_answer() {
        let mut app = logged_in_app();
        app.submit_quiz();
        assert_eq!(app.error_message.as_deref(), Some(EMPTY_QUIZ_MESSAGE));
    }

    #[test]
    fn test_quiz_answers_replace_per_question() {
        let mut app = logged_in_app();
        app.quiz.questions = vec![question(4, "Loops"), question(2, "Loops")];

        app.select_answer(AnswerOption::A);
        app.select_answer(AnswerOption::C);
        app.quiz.question_selection = 1;
        app.select_answer(AnswerOption::B);

        let submission = app.quiz.submission();
        let picked: Vec<(i64, &str)> = submission
            .answers
            .iter()
            .map(|a| (a.id, a.selected_option.as_str()))
            .collect();
        assert_eq!(picked, vec![(2, "B"), (4, "C")]);
    }

    #[test]
    fn test_run_code_rejects_blank_code() {
        let mut app = logged_in_app();
        app.code = "  \n\t".into();
        app.run_code();
        assert_eq!(app.error_message.as_deref(), Some(EMPTY_CODE_MESSAGE));
    }

    #[test]
    fn test_code_editor() {
        let mut app = logged_in_app();
        for c in "class A {".chars() {
            app.insert_code_char(c);
        }
        app.insert_code_char('\n');
        app.insert_code_indent();
        app.insert_code_char('\x07');
        app.insert_code_char('}');
        app.code_backspace();
        assert_eq!(app.code, "class A {\n    ");
    }

    #[test]
    fn test_toggle_register_role() {
        let mut app = app_with(MemoryStore::new());
        assert_eq!(app.register_role, Role::User);
        app.toggle_register_role();
        assert_eq!(app.register_role, Role::Admin);
        app.toggle_register_role();
        assert_eq!(app.register_role, Role::User);
    }

    // -------------------------------------------------------------------------
    // Tab Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_tab_next() {
        assert_eq!(Tab::Dashboard.next(), Tab::Courses);
        assert_eq!(Tab::Quiz.next(), Tab::Compiler);
        assert_eq!(Tab::Compiler.next(), Tab::Dashboard); // Wraps around
    }

    #[test]
    fn test_tab_prev() {
        assert_eq!(Tab::Dashboard.prev(), Tab::Compiler); // Wraps around
        assert_eq!(Tab::Topics.prev(), Tab::Courses);
    }

    #[test]
    fn test_tab_from_digit() {
        assert_eq!(Tab::from_digit('1'), Some(Tab::Dashboard));
        assert_eq!(Tab::from_digit('6'), Some(Tab::Compiler));
        assert_eq!(Tab::from_digit('0'), None);
        assert_eq!(Tab::from_digit('7'), None);
        assert_eq!(Tab::from_digit('x'), None);
    }

    // -------------------------------------------------------------------------
    // Input Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_can_add_username_char() {
        assert!(can_add_username_char(0, 'a'));
        assert!(can_add_username_char(49, 'z'));
        assert!(!can_add_username_char(50, 'a'));
        assert!(!can_add_username_char(0, '\x00'));
        assert!(!can_add_username_char(0, '\n'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(127, '!'));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\r'));
    }
}
