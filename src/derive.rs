// src/derive.rs
//
// Pure computations over in-memory collections. Nothing here fails or
// touches storage.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Entity, HasStatus, Member, Project, Task, TaskStatus};

/// Rounded percentage of the project's tasks that are done; 0 with no tasks.
pub fn progress(project_id: &str, tasks: &[Task]) -> u8 {
    let (total, done) = tasks
        .iter()
        .filter(|t| t.project_id.as_deref() == Some(project_id))
        .fold((0u32, 0u32), |(total, done), t| {
            (total + 1, done + u32::from(t.status == TaskStatus::Done))
        });
    if total == 0 {
        return 0;
    }
    (f64::from(done) * 100.0 / f64::from(total)).round() as u8
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_projects: usize,
    pub completed_tasks: usize,
    pub total_members: usize,
    pub pending_tasks: usize,
}

pub fn dashboard_stats(projects: &[Project], tasks: &[Task], members: &[Member]) -> DashboardStats {
    DashboardStats {
        active_projects: projects.iter().filter(|p| p.status.is_active()).count(),
        completed_tasks: tasks.iter().filter(|t| t.status == TaskStatus::Done).count(),
        total_members: members.len(),
        pending_tasks: tasks.iter().filter(|t| t.status.is_pending()).count(),
    }
}

/// Newest `n` entries by `createdAt`. Ties keep their stored order.
pub fn recent<K: Entity>(items: &[K], n: usize) -> Vec<K> {
    let mut sorted = items.to_vec();
    // sort_by is stable
    sorted.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    sorted.truncate(n);
    sorted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<S> {
    All,
    Only(S),
}

impl<S: DeserializeOwned> StatusFilter<S> {
    /// `None` or "All" selects everything; anything else must name a status.
    pub fn from_query(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => Some(StatusFilter::All),
            Some(s) if s.eq_ignore_ascii_case("all") => Some(StatusFilter::All),
            Some(s) => serde_json::from_value(serde_json::Value::String(s.to_string()))
                .ok()
                .map(StatusFilter::Only),
        }
    }
}

pub fn filter_by_status<K>(items: &[K], filter: StatusFilter<K::Status>) -> Vec<K>
where
    K: HasStatus + Clone,
{
    match filter {
        StatusFilter::All => items.to_vec(),
        StatusFilter::Only(status) => items.iter().filter(|i| i.status() == status).cloned().collect(),
    }
}

/// A task with its weak references resolved for display. Dangling
/// references come back as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub project_name: Option<String>,
    pub assignee_name: Option<String>,
}

pub fn resolve_task(task: &Task, projects: &[Project], members: &[Member]) -> TaskView {
    let mut task = task.clone();
    let project_name = task
        .project_id
        .as_deref()
        .and_then(|id| projects.iter().find(|p| p.id == id))
        .map(|p| p.name.clone());
    if project_name.is_none() {
        task.project_id = None;
    }
    let assignee_name = task
        .assignee
        .as_deref()
        .and_then(|id| members.iter().find(|m| m.id == id))
        .map(|m| m.name.clone());
    if assignee_name.is_none() {
        task.assignee = None;
    }
    TaskView {
        task,
        project_name,
        assignee_name,
    }
}

pub fn resolve_tasks(tasks: &[Task], projects: &[Project], members: &[Member]) -> Vec<TaskView> {
    tasks
        .iter()
        .map(|t| resolve_task(t, projects, members))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub progress: u8,
    pub task_count: usize,
    pub done_count: usize,
}

pub fn project_summary(project: &Project, tasks: &[Task]) -> ProjectSummary {
    let own: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.project_id.as_deref() == Some(project.id.as_str()))
        .collect();
    ProjectSummary {
        project: project.clone(),
        progress: progress(&project.id, tasks),
        task_count: own.len(),
        done_count: own.iter().filter(|t| t.status == TaskStatus::Done).count(),
    }
}

pub fn project_summaries(projects: &[Project], tasks: &[Task]) -> Vec<ProjectSummary> {
    projects.iter().map(|p| project_summary(p, tasks)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberWorkload {
    #[serde(flatten)]
    pub member: Member,
    pub initials: String,
    pub open_tasks: usize,
}

pub fn member_workload(members: &[Member], tasks: &[Task]) -> Vec<MemberWorkload> {
    let mut open: HashMap<&str, usize> = HashMap::new();
    for task in tasks.iter().filter(|t| t.status.is_pending()) {
        if let Some(assignee) = task.assignee.as_deref() {
            *open.entry(assignee).or_insert(0) += 1;
        }
    }
    members
        .iter()
        .map(|m| MemberWorkload {
            member: m.clone(),
            initials: m.initials(),
            open_tasks: open.get(m.id.as_str()).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, ProjectStatus};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn task(id: &str, project: Option<&str>, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            status,
            priority: Priority::Medium,
            assignee: None,
            project_id: project.map(String::from),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn project(id: &str, status: ProjectStatus) -> Project {
        Project {
            id: id.to_string(),
            name: format!("Project {}", id),
            description: String::new(),
            status,
            priority: Priority::Low,
            color: "#667eea".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn progress_is_zero_without_tasks() {
        assert_eq!(progress("p", &[]), 0);
        assert_eq!(progress("p", &[task("t", Some("other"), TaskStatus::Done)]), 0);
    }

    #[test]
    fn progress_rounds_two_of_three_to_67() {
        let tasks = vec![
            task("a", Some("p"), TaskStatus::Done),
            task("b", Some("p"), TaskStatus::Done),
            task("c", Some("p"), TaskStatus::Todo),
            task("d", Some("q"), TaskStatus::Todo),
        ];
        assert_eq!(progress("p", &tasks), 67);
        assert_eq!(progress("q", &tasks), 0);
    }

    #[test]
    fn dashboard_stats_counts_by_status() {
        let projects = vec![project("1", ProjectStatus::Planning), project("2", ProjectStatus::Completed)];
        let tasks = vec![task("a", None, TaskStatus::Done), task("b", None, TaskStatus::Todo)];
        let stats = dashboard_stats(&projects, &tasks, &[]);
        assert_eq!(
            stats,
            DashboardStats {
                active_projects: 1,
                completed_tasks: 1,
                total_members: 0,
                pending_tasks: 1,
            }
        );
    }

    #[test]
    fn recent_sorts_descending_and_keeps_ties_in_order() {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut a = task("a", None, TaskStatus::Todo);
        let mut b = task("b", None, TaskStatus::Todo);
        let mut c = task("c", None, TaskStatus::Todo);
        a.created_at = base;
        b.created_at = base + Duration::days(1);
        c.created_at = base;
        let ids: Vec<String> = recent(&[a, b, c], 2).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn filter_done_preserves_order() {
        let tasks = vec![
            task("a", None, TaskStatus::Done),
            task("b", None, TaskStatus::Todo),
            task("c", None, TaskStatus::Done),
            task("d", None, TaskStatus::InProgress),
        ];
        let done: Vec<String> = filter_by_status(&tasks, StatusFilter::Only(TaskStatus::Done))
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(done, vec!["a", "c"]);
        assert_eq!(filter_by_status(&tasks, StatusFilter::All), tasks);
    }

    #[test]
    fn status_filter_parses_query_values() {
        assert_eq!(StatusFilter::<TaskStatus>::from_query(None), Some(StatusFilter::All));
        assert_eq!(StatusFilter::<TaskStatus>::from_query(Some("All")), Some(StatusFilter::All));
        assert_eq!(
            StatusFilter::<TaskStatus>::from_query(Some("In Progress")),
            Some(StatusFilter::Only(TaskStatus::InProgress))
        );
        assert_eq!(
            StatusFilter::<ProjectStatus>::from_query(Some("on-hold")),
            Some(StatusFilter::Only(ProjectStatus::OnHold))
        );
        assert_eq!(StatusFilter::<TaskStatus>::from_query(Some("bogus")), None);
    }

    #[test]
    fn dangling_references_resolve_as_absent() {
        let mut t = task("a", Some("gone"), TaskStatus::Todo);
        t.assignee = Some("m_gone".into());
        let view = resolve_task(&t, &[project("p", ProjectStatus::Planning)], &[]);
        assert_eq!(view.task.project_id, None);
        assert_eq!(view.task.assignee, None);
        assert_eq!(view.project_name, None);

        let ok = resolve_task(&task("b", Some("p"), TaskStatus::Todo), &[project("p", ProjectStatus::Planning)], &[]);
        assert_eq!(ok.project_name.as_deref(), Some("Project p"));
    }

    #[test]
    fn workload_counts_open_tasks_per_member() {
        let members = Member::sample();
        let counts: Vec<usize> = member_workload(&members, &Task::sample())
            .iter()
            .map(|w| w.open_tasks)
            .collect();
        // sample task 2 (Jane) is done
        assert_eq!(counts, vec![1, 0, 1, 1]);
    }

    #[test]
    fn summary_carries_counts() {
        let tasks = vec![task("a", Some("p"), TaskStatus::Done), task("b", Some("p"), TaskStatus::Todo)];
        let summary = project_summary(&project("p", ProjectStatus::InProgress), &tasks);
        assert_eq!((summary.progress, summary.task_count, summary.done_count), (50, 2, 1));
    }
}
