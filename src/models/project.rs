use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, HasStatus, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(alias = "planning")]
    Planning,
    #[serde(rename = "In Progress", alias = "in-progress", alias = "review")]
    InProgress,
    #[serde(alias = "completed")]
    Completed,
    #[serde(rename = "On Hold", alias = "on-hold")]
    OnHold,
}

pub const DEFAULT_PROJECT_COLOR: &str = "#667eea";

fn default_color() -> String {
    DEFAULT_PROJECT_COLOR.to_string()
}

impl ProjectStatus {
    /// Planning and in-progress projects count as active on the dashboard.
    pub fn is_active(&self) -> bool {
        matches!(self, ProjectStatus::Planning | ProjectStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    /// `#rrggbb` accent shown on project cards.
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(alias = "due")]
    pub due_date: NaiveDate,
    #[serde(alias = "created", deserialize_with = "super::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Projects;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sample() -> Vec<Self> {
        vec![
            sample_project(
                "p_sample_1",
                "Website Redesign",
                "Complete redesign of company website",
                ProjectStatus::InProgress,
                Priority::High,
                "#667eea",
                (2024, 3, 15),
                (2024, 1, 10),
            ),
            sample_project(
                "p_sample_2",
                "Mobile App Development",
                "iOS and Android app development",
                ProjectStatus::Planning,
                Priority::High,
                "#5e4db0",
                (2024, 4, 30),
                (2024, 2, 1),
            ),
            sample_project(
                "p_sample_3",
                "API Integration",
                "Third-party API integration project",
                ProjectStatus::Completed,
                Priority::Medium,
                "#36b37e",
                (2024, 2, 20),
                (2024, 1, 25),
            ),
        ]
    }
}

impl HasStatus for Project {
    type Status = ProjectStatus;

    fn status(&self) -> ProjectStatus {
        self.status
    }
}

fn sample_project(
    id: &str,
    name: &str,
    description: &str,
    status: ProjectStatus,
    priority: Priority,
    color: &str,
    due: (i32, u32, u32),
    created: (i32, u32, u32),
) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        status,
        priority,
        color: color.to_string(),
        due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap_or_default(),
        created_at: Utc
            .with_ymd_and_hms(created.0, created.1, created.2, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    }
}
