use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// One person on the team. Tasks point at members through `assignee`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    /// Missing in standalone dashboard exports; those members sort oldest.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Entity for Member {
    const KIND: EntityKind = EntityKind::Members;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sample() -> Vec<Self> {
        [
            ("m_sample_1", "John Doe", "john@example.com", "Developer", 15),
            ("m_sample_2", "Jane Smith", "jane@example.com", "Designer", 20),
            ("m_sample_3", "Mike Johnson", "mike@example.com", "Technical Writer", 22),
            ("m_sample_4", "Sarah Wilson", "sarah@example.com", "Reviewer", 25),
        ]
        .into_iter()
        .map(|(id, name, email, role, day)| Member {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            created_at: Utc
                .with_ymd_and_hms(2024, 1, day, 0, 0, 0)
                .single()
                .unwrap_or_default(),
        })
        .collect()
    }
}

impl Member {
    /// Two-letter avatar initials, e.g. "Jane Smith" -> "JS".
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}
