//! API client for the Java Learning Hub REST API.
//!
//! Every authorized request takes its bearer token from the [`SessionGuard`]
//! and hands the response status to [`SessionGuard::handle_auth_failure`]
//! before anything else looks at the body.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{Credential, Role, SessionGuard, AUTH_FAILURE_MESSAGE};
use crate::config::Config;
use crate::models::{
    sort_lessons, CompileRequest, CompileResult, Course, CourseContent, Dashboard, NewCourse,
    PracticeQuestion, QuizQuestion, QuizResult, QuizSubmission, Topic, ALL_TOPICS,
};

use super::ApiError;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    username: Option<String>,
    role: Option<String>,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
    role: &'a str,
}

/// API client for the learning hub.
/// Clone is cheap - reqwest::Client and SessionGuard are both Arc inside.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    guard: SessionGuard,
}

impl ApiClient {
    /// Create a new API client with the configuration's default timeout
    pub fn new(base_url: impl Into<String>, guard: SessionGuard) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, guard, Config::default().request_timeout())
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        guard: SessionGuard,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            guard,
        })
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Log in and store the returned credential.
    ///
    /// A 401/403 here means bad credentials, not an expired session, so it is
    /// reported as a rejected login and does not touch the stored session.
    /// Transport failures leave the stored session exactly as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        let url = self.url("/auth/login");
        debug!(url = %url, username, "Sending login request");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Login request failed");
                ApiError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %ApiError::truncate_body(&body), "Login rejected");
            return Err(ApiError::from_status(status, &body, "Login failed"));
        }

        let auth: LoginResponse = Self::parse_json(response, &url).await?;
        let username = auth
            .username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| username.to_string());
        let credential = Credential::new(auth.token, username, Role::parse(auth.role.as_deref()));

        self.guard.set_credential(&credential)?;
        info!(username = %credential.username, "Login successful");
        Ok(credential)
    }

    /// Create an account. Any 2xx is success; the caller logs in afterwards.
    pub async fn register(&self, username: &str, password: &str, role: &Role) -> Result<(), ApiError> {
        let url = self.url("/auth/register");
        debug!(url = %url, username, role = %role, "Sending register request");

        let response = self
            .client
            .post(&url)
            .json(&RegisterRequest {
                username,
                password,
                role: role.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(username, "Registration successful");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body, "Registration failed"))
        }
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Route the status through the guard, then turn any remaining failure
    /// into an application error.
    async fn check_response(&self, response: Response, fallback: &str) -> Result<Response, ApiError> {
        let status = response.status();

        let mut reported = None;
        let outcome = self
            .guard
            .handle_auth_failure(status.as_u16(), |message| reported = Some(message.to_string()));
        if outcome.is_handled() {
            return Err(ApiError::SessionExpired(
                reported.unwrap_or_else(|| AUTH_FAILURE_MESSAGE.to_string()),
            ));
        }

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %ApiError::truncate_body(&body), "Request failed");
            Err(ApiError::from_status(status, &body, fallback))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        response.json().await.map_err(|e| {
            warn!(url = url, error = %e, "Failed to parse JSON response");
            ApiError::InvalidResponse(format!("{}: {}", url, e))
        })
    }

    /// Attach the bearer token and send. Fails with `NotLoggedIn` without
    /// touching the network when no token is stored.
    async fn send_authorized(&self, request: RequestBuilder, fallback: &str) -> Result<Response, ApiError> {
        let token = self.guard.token().ok_or(ApiError::NotLoggedIn)?;

        let response = request.bearer_auth(token).send().await.map_err(|e| {
            warn!(error = %e, "Request failed before a response arrived");
            ApiError::Network(e)
        })?;

        self.check_response(response, fallback).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.send_authorized(self.client.get(&url), fallback).await?;
        Self::parse_json(response, &url).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self
            .send_authorized(self.client.post(&url).json(body), fallback)
            .await?;
        Self::parse_json(response, &url).await
    }

    async fn delete(&self, path: &str, fallback: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!(url = %url, "DELETE");
        self.send_authorized(self.client.delete(&url), fallback).await?;
        Ok(())
    }

    // =========================================================================
    // Courses
    // =========================================================================

    pub async fn fetch_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.get("/courses", "Failed to fetch courses").await
    }

    pub async fn fetch_course(&self, course_id: i64) -> Result<Course, ApiError> {
        self.get(&format!("/courses/{}", course_id), "Failed to fetch course details")
            .await
    }

    /// Lessons of a course, in presentation order
    pub async fn fetch_course_content(&self, course_id: i64) -> Result<Vec<CourseContent>, ApiError> {
        let mut lessons: Vec<CourseContent> = self
            .get(
                &format!("/courses/{}/content", course_id),
                "Failed to fetch course content",
            )
            .await?;
        sort_lessons(&mut lessons);
        Ok(lessons)
    }

    /// Course and its lessons, requested concurrently
    pub async fn fetch_course_details(
        &self,
        course_id: i64,
    ) -> Result<(Course, Vec<CourseContent>), ApiError> {
        let (course, lessons) = futures::future::join(
            self.fetch_course(course_id),
            self.fetch_course_content(course_id),
        )
        .await;
        Ok((course?, lessons?))
    }

    pub async fn create_course(&self, course: &NewCourse) -> Result<Course, ApiError> {
        self.post("/courses", course, "Failed to add course").await
    }

    pub async fn delete_course(&self, course_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/courses/{}", course_id), "Failed to delete course")
            .await
    }

    // =========================================================================
    // Topics
    // =========================================================================

    pub async fn fetch_topics(&self) -> Result<Vec<Topic>, ApiError> {
        self.get("/topics", "Failed to fetch topics").await
    }

    pub async fn fetch_topic(&self, topic_id: i64) -> Result<Topic, ApiError> {
        self.get(&format!("/topics/{}", topic_id), "Failed to fetch topic")
            .await
    }

    // =========================================================================
    // Practice
    // =========================================================================

    pub async fn fetch_practice_questions(&self) -> Result<Vec<PracticeQuestion>, ApiError> {
        self.get("/practice/questions", "Failed to fetch practice questions")
            .await
    }

    pub async fn fetch_practice_question(&self, question_id: i64) -> Result<PracticeQuestion, ApiError> {
        self.get(
            &format!("/practice/questions/{}", question_id),
            "Failed to fetch practice question",
        )
        .await
    }

    // =========================================================================
    // Quiz
    // =========================================================================

    pub async fn fetch_quiz_questions(&self) -> Result<Vec<QuizQuestion>, ApiError> {
        self.get("/quiz/questions", "Failed to fetch quiz questions")
            .await
    }

    /// Questions for one topic, or every question for [`ALL_TOPICS`]
    pub async fn fetch_quiz_questions_for(&self, topic: &str) -> Result<Vec<QuizQuestion>, ApiError> {
        if topic == ALL_TOPICS {
            return self.fetch_quiz_questions().await;
        }
        let mut url = reqwest::Url::parse(&self.url("/quiz/questions/topic/"))
            .map_err(|e| ApiError::InvalidResponse(format!("bad base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidResponse("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .push(topic);

        debug!(url = %url, "GET");
        let response = self
            .send_authorized(self.client.get(url.clone()), "Failed to fetch quiz questions")
            .await?;
        Self::parse_json(response, url.as_str()).await
    }

    pub async fn submit_quiz(&self, submission: &QuizSubmission) -> Result<QuizResult, ApiError> {
        self.post("/quiz/submit", submission, "Failed to submit quiz")
            .await
    }

    // =========================================================================
    // Compiler & dashboard
    // =========================================================================

    pub async fn run_code(&self, code: &str) -> Result<CompileResult, ApiError> {
        let request = CompileRequest {
            code: code.to_string(),
        };
        self.post("/compiler/run", &request, "Failed to run code")
            .await
    }

    pub async fn fetch_dashboard(&self) -> Result<Dashboard, ApiError> {
        self.get("/dashboard/me", "Failed to fetch dashboard").await
    }
}

