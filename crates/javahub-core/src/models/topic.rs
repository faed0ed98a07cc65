use serde::Deserialize;

/// Category label for topics the server did not categorize
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Topic {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub content: Option<String>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
}

impl Topic {
    /// Server category, or "Uncategorized" when it is missing or empty
    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicGroup {
    pub category: String,
    pub topics: Vec<Topic>,
}

/// Group topics by category, keeping categories in first-seen order and
/// topics in server order within each category.
pub fn group_by_category(topics: &[Topic]) -> Vec<TopicGroup> {
    let mut groups: Vec<TopicGroup> = Vec::new();
    for topic in topics {
        let category = topic.category();
        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.topics.push(topic.clone()),
            None => groups.push(TopicGroup {
                category: category.to_string(),
                topics: vec![topic.clone()],
            }),
        }
    }
    groups
}
