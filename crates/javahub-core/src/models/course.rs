use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Course {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body for creating a course
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
}

impl NewCourse {
    /// Both fields are required by the form
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }
}

/// A lesson inside a course
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseContent {
    pub id: i64,
    #[serde(default)]
    pub course_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub order_number: i32,
}

/// Order lessons the way the course presents them
pub fn sort_lessons(lessons: &mut [CourseContent]) {
    lessons.sort_by_key(|l| (l.order_number, l.id));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_content_camel_case() {
        let lesson: CourseContent = serde_json::from_str(
            r#"{"id":4,"courseId":2,"title":"Loops","content":"for ...","orderNumber":3}"#,
        )
        .unwrap();
        assert_eq!(lesson.course_id, 2);
        assert_eq!(lesson.order_number, 3);
    }

    #[test]
    fn test_sort_lessons() {
        let lesson = |id, order_number| CourseContent {
            id,
            course_id: 1,
            title: String::new(),
            content: None,
            order_number,
        };
        let mut lessons = vec![lesson(1, 3), lesson(2, 1), lesson(3, 2)];
        sort_lessons(&mut lessons);
        let ids: Vec<i64> = lessons.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_new_course_requires_both_fields() {
        let mut course = NewCourse::default();
        assert!(!course.is_complete());
        course.title = "Java Basics".into();
        course.description = "   ".into();
        assert!(!course.is_complete());
        course.description = "Intro".into();
        assert!(course.is_complete());
    }
}
