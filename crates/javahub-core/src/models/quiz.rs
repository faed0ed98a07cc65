use std::fmt;

use serde::{Deserialize, Serialize};

/// Topic label for questions the server did not tag
pub const GENERAL_TOPIC: &str = "General";

/// Pseudo-topic that fetches every question
pub const ALL_TOPICS: &str = "All";

/// Score at or above which a result counts as good
const GOOD_SCORE: f64 = 80.0;

/// Score at or above which a result counts as fair
const FAIR_SCORE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub const ALL: [AnswerOption; 4] = [AnswerOption::A, AnswerOption::B, AnswerOption::C, AnswerOption::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }

    /// Parse a key press or server value ("a", "B", ...)
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(AnswerOption::A),
            'B' => Some(AnswerOption::B),
            'C' => Some(AnswerOption::C),
            'D' => Some(AnswerOption::D),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: i64,
    #[serde(default)]
    pub question: String,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_option: Option<String>,
    pub explanation: Option<String>,
    pub topic: Option<String>,
}

impl QuizQuestion {
    pub fn option_text(&self, option: AnswerOption) -> Option<&str> {
        match option {
            AnswerOption::A => self.option_a.as_deref(),
            AnswerOption::B => self.option_b.as_deref(),
            AnswerOption::C => self.option_c.as_deref(),
            AnswerOption::D => self.option_d.as_deref(),
        }
    }

    /// Server topic, or "General" when it is missing or empty
    pub fn topic(&self) -> &str {
        self.topic
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(GENERAL_TOPIC)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub id: i64,
    pub selected_option: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuizSubmission {
    pub answers: Vec<QuizAnswer>,
}

impl QuizSubmission {
    /// Build a submission from `(question id, chosen option)` pairs, ordered by
    /// question id so the request body is stable.
    pub fn from_answers<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = (i64, AnswerOption)>,
    {
        let mut answers: Vec<QuizAnswer> = answers
            .into_iter()
            .map(|(id, option)| QuizAnswer {
                id,
                selected_option: option.as_str().to_string(),
            })
            .collect();
        answers.sort_by_key(|a| a.id);
        Self { answers }
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizResult {
    pub score: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub results: Vec<QuizResultItem>,
}

impl QuizResult {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizResultItem {
    pub question_id: i64,
    pub question: String,
    pub selected_option: Option<String>,
    pub correct_option: Option<String>,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= GOOD_SCORE {
            ScoreBand::Good
        } else if score >= FAIR_SCORE {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

/// A quiz topic and how many questions it has
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizTopic {
    pub topic: String,
    pub count: usize,
}

/// Count questions per topic in first-seen order
pub fn count_by_topic(questions: &[QuizQuestion]) -> Vec<QuizTopic> {
    let mut topics: Vec<QuizTopic> = Vec::new();
    for question in questions {
        let name = question.topic();
        match topics.iter_mut().find(|t| t.topic == name) {
            Some(topic) => topic.count += 1,
            None => topics.push(QuizTopic {
                topic: name.to_string(),
                count: 1,
            }),
        }
    }
    topics
}
