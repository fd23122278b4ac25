use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, HasStatus, Priority};

/// Lowercase aliases cover the `todo / in-progress / completed` schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(alias = "todo")]
    Todo,
    #[serde(rename = "In Progress", alias = "in-progress")]
    InProgress,
    #[serde(alias = "completed", alias = "done")]
    Done,
}

impl TaskStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Todo | TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Weak reference to a member id.
    #[serde(default)]
    pub assignee: Option<String>,
    /// Weak reference to a project id.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(alias = "due")]
    pub due_date: NaiveDate,
    #[serde(alias = "created", deserialize_with = "super::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Tasks;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sample() -> Vec<Self> {
        vec![
            sample_task(
                "t_sample_1",
                "Design login page",
                "Create modern and user-friendly login interface",
                TaskStatus::InProgress,
                Priority::High,
                Some("m_sample_1"),
                Some("p_sample_1"),
                (2024, 3, 10),
                (2024, 2, 15),
            ),
            sample_task(
                "t_sample_2",
                "Setup database",
                "Configure database schema and connections",
                TaskStatus::Done,
                Priority::High,
                Some("m_sample_2"),
                Some("p_sample_3"),
                (2024, 2, 28),
                (2024, 2, 1),
            ),
            sample_task(
                "t_sample_3",
                "Write documentation",
                "Document API endpoints and usage",
                TaskStatus::Todo,
                Priority::Medium,
                Some("m_sample_3"),
                Some("p_sample_3"),
                (2024, 3, 20),
                (2024, 2, 20),
            ),
            sample_task(
                "t_sample_4",
                "Code review",
                "Review pull requests from team members",
                TaskStatus::InProgress,
                Priority::Medium,
                Some("m_sample_4"),
                None,
                (2024, 3, 5),
                (2024, 2, 25),
            ),
        ]
    }
}

impl HasStatus for Task {
    type Status = TaskStatus;

    fn status(&self) -> TaskStatus {
        self.status
    }
}

#[allow(clippy::too_many_arguments)]
fn sample_task(
    id: &str,
    title: &str,
    description: &str,
    status: TaskStatus,
    priority: Priority,
    assignee: Option<&str>,
    project_id: Option<&str>,
    due: (i32, u32, u32),
    created: (i32, u32, u32),
) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        status,
        priority,
        assignee: assignee.map(String::from),
        project_id: project_id.map(String::from),
        due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap_or_default(),
        created_at: Utc
            .with_ymd_and_hms(created.0, created.1, created.2, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternate_schema_values_normalize() {
        let raw = r#"{
            "id": "t_1", "title": "Testing", "status": "completed", "priority": "medium",
            "dueDate": "2024-12-25", "createdAt": "2024-12-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.assignee, None);
        assert_eq!(task.project_id, None);
        assert_eq!(task.description, "");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let raw = r#"{
            "id": "t_1", "title": "x", "status": "review", "priority": "Low",
            "dueDate": "2024-12-25", "createdAt": "2024-12-01T00:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());
    }
}
