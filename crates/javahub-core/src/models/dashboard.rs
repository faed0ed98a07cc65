use serde::Deserialize;

use crate::utils::format_datetime;

/// Progress counters for the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dashboard {
    pub quizzes_taken: u32,
    pub total_correct_answers: u32,
    pub last_quiz_score: Option<f64>,
    pub topics_viewed: u32,
    pub courses_visited: u32,
    pub practice_attempts: u32,
    pub last_compiled_output: Option<String>,
    pub last_active: Option<String>,
}

impl Dashboard {
    pub fn last_quiz_score_display(&self) -> String {
        match self.last_quiz_score {
            Some(score) => format!("{:.1}%", score),
            None => "N/A".to_string(),
        }
    }

    pub fn last_active_display(&self) -> String {
        self.last_active
            .as_deref()
            .map(format_datetime)
            .unwrap_or_else(|| "never".to_string())
    }
}
