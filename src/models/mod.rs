pub mod member;
pub mod project;
pub mod task;
pub mod user;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use member::Member;
pub use project::{Project, ProjectStatus, DEFAULT_PROJECT_COLOR};
pub use task::{Task, TaskStatus};
pub use user::{UserAccount, UserProfile};

/// The three collections a scope owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Projects,
    Tasks,
    Members,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Projects => "projects",
            EntityKind::Tasks => "tasks",
            EntityKind::Members => "members",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared by projects and tasks. Lowercase spellings come from the
/// standalone dashboard's exports, which leave projects without one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "low")]
    Low,
    #[default]
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
}

/// Common surface the data store and the derivation functions need.
pub trait Entity: Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn created_at(&self) -> chrono::DateTime<chrono::Utc>;

    /// Illustrative records written when a scope is first touched under
    /// the sample seed policy.
    fn sample() -> Vec<Self>;
}

/// Entities that carry a status enumeration and can be filtered by it.
pub trait HasStatus {
    type Status: Copy + PartialEq;

    fn status(&self) -> Self::Status;
}

/// Accepts RFC 3339 timestamps and the bare `YYYY-MM-DD` dates written by
/// the standalone dashboard (read as midnight UTC).
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::de::{self, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}

/// Time-ordered identifier with a kind prefix, e.g. `p_018f...`.
pub fn new_entity_id(kind: EntityKind) -> String {
    let prefix = match kind {
        EntityKind::Projects => "p",
        EntityKind::Tasks => "t",
        EntityKind::Members => "m",
    };
    format!("{}_{}", prefix, Uuid::now_v7().simple())
}
