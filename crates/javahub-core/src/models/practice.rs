use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestion {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub sample_input: Option<String>,
    pub sample_output: Option<String>,
}
