//! Data models for Java Learning Hub API responses.
//!
//! Field names follow the server's camelCase JSON. Everything the server may
//! omit is optional or defaulted, so a partial payload still renders.

pub mod compiler;
pub mod course;
pub mod dashboard;
pub mod practice;
pub mod quiz;
pub mod topic;

pub use compiler::{CompileRequest, CompileResult};
pub use course::{sort_lessons, Course, CourseContent, NewCourse};
pub use dashboard::Dashboard;
pub use practice::PracticeQuestion;
pub use quiz::{
    count_by_topic, AnswerOption, QuizAnswer, QuizQuestion, QuizResult, QuizResultItem,
    QuizSubmission, QuizTopic, ScoreBand, ALL_TOPICS,
};
pub use topic::{group_by_category, Topic, TopicGroup};
