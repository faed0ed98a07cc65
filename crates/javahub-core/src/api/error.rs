use thiserror::Error;

use crate::auth::StorageError;

/// Shown when the server cannot be reached or answers with something that is
/// not the expected JSON.
pub const UNREACHABLE_MESSAGE: &str =
    "Backend unreachable. Check that the server is running and try again.";

/// Shown when a view needs a session and none is stored.
pub const NOT_LOGGED_IN_MESSAGE: &str = "You must be logged in first.";

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server rejected the token. The session guard has already cleared
    /// the credential and scheduled the redirect; the payload is the message
    /// it reported.
    #[error("{0}")]
    SessionExpired(String),

    #[error("{}", NOT_LOGGED_IN_MESSAGE)]
    NotLoggedIn,

    /// Non-success status that is not an authorization failure
    #[error("{message} (status {status})")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Could not save session: {0}")]
    Storage(#[from] StorageError),
}

/// The three ways a request can fail, as far as the user is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 401/403: session wiped, redirect pending
    Authorization,
    /// No usable response at all; session untouched
    Transport,
    /// The server (or local state) said no; session untouched
    Application,
}

/// Maximum length for error response bodies in log messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The `{error}` field of a failure body, if there is a non-blank one
    pub(crate) fn server_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
    }

    /// Build the error for a non-success, non-auth status. Uses the server's
    /// message when present, else `fallback`.
    pub fn from_status(status: reqwest::StatusCode, body: &str, fallback: &str) -> Self {
        ApiError::Rejected {
            status: status.as_u16(),
            message: Self::server_message(body).unwrap_or_else(|| fallback.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::SessionExpired(_) => ErrorKind::Authorization,
            ApiError::Network(_) | ApiError::InvalidResponse(_) => ErrorKind::Transport,
            ApiError::NotLoggedIn | ApiError::Rejected { .. } | ApiError::Storage(_) => {
                ErrorKind::Application
            }
        }
    }

    /// Text to put in front of the user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::SessionExpired(message) => message.clone(),
            ApiError::Network(_) | ApiError::InvalidResponse(_) => UNREACHABLE_MESSAGE.to_string(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::NotLoggedIn | ApiError::Storage(_) => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_prefers_server_message() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Username already exists"}"#,
            "Registration failed",
        );
        assert_eq!(err.user_message(), "Username already exists");
        assert_eq!(err.kind(), ErrorKind::Application);
    }

    #[test]
    fn test_from_status_falls_back() {
        for body in ["", "<html>oops</html>", r#"{"error":""}"#, r#"{"message":"x"}"#] {
            let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, body, "Failed to fetch topics");
            assert_eq!(err.user_message(), "Failed to fetch topics");
        }
    }

    #[test]
    fn test_rejected_display_includes_status() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "", "Failed to fetch topic");
        assert_eq!(err.to_string(), "Failed to fetch topic (status 404)");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(ApiError::SessionExpired("x".into()).kind(), ErrorKind::Authorization);
        assert_eq!(ApiError::InvalidResponse("x".into()).kind(), ErrorKind::Transport);
        assert_eq!(
            ApiError::InvalidResponse("x".into()).user_message(),
            UNREACHABLE_MESSAGE
        );
        assert_eq!(ApiError::NotLoggedIn.kind(), ErrorKind::Application);
    }

    #[test]
    fn test_truncate_body() {
        let short = "short body";
        assert_eq!(ApiError::truncate_body(short), short);

        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
    }
}
