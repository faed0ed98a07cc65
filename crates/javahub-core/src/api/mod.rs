//! REST API client module for the Java Learning Hub services.
//!
//! This module provides the `ApiClient` for logging in, registering, and
//! fetching courses, topics, practice questions, quizzes, compiler runs, and
//! the progress dashboard.
//!
//! Authorized endpoints use a bearer token owned by the session guard.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, ErrorKind, NOT_LOGGED_IN_MESSAGE, UNREACHABLE_MESSAGE};
