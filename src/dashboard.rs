// src/dashboard.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::auth::current_session;
use crate::derive::{dashboard_stats, project_summaries, recent, resolve_tasks, DashboardStats, ProjectSummary, TaskView};
use crate::error::AppResult;
use crate::workspace::Workspace;

const RECENT_PROJECTS: usize = 6;
const RECENT_TASKS: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub projects: Option<usize>,
    pub tasks: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_projects: Vec<ProjectSummary>,
    pub recent_tasks: Vec<TaskView>,
}

/// Stat cards plus the newest projects and tasks.
pub fn build_dashboard(ws: &Workspace, project_limit: usize, task_limit: usize) -> Dashboard {
    let projects = recent(&ws.projects, project_limit);
    let tasks = recent(&ws.tasks, task_limit);
    Dashboard {
        stats: dashboard_stats(&ws.projects, &ws.tasks, &ws.members),
        recent_projects: project_summaries(&projects, &ws.tasks),
        recent_tasks: resolve_tasks(&tasks, &ws.projects, &ws.members),
    }
}

/// GET /dashboard
pub async fn get_dashboard(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<DashboardQuery>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let ws = data.workspaces.read(&data.scope_for(&session)).await?;
    let dashboard = build_dashboard(
        &ws,
        query.projects.unwrap_or(RECENT_PROJECTS),
        query.tasks.unwrap_or(RECENT_TASKS),
    );
    Ok(HttpResponse::Ok().json(dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_store::SeedPolicy;

    fn sample() -> Workspace {
        let seed = SeedPolicy::Sample;
        Workspace {
            projects: seed.seed(),
            tasks: seed.seed(),
            members: seed.seed(),
        }
    }

    #[test]
    fn limits_recent_lists() {
        let dashboard = build_dashboard(&sample(), 2, 3);
        assert_eq!(dashboard.recent_projects.len(), 2);
        assert_eq!(dashboard.recent_tasks.len(), 3);
        assert_eq!(dashboard.stats.total_members, 4);
    }

    #[test]
    fn empty_workspace_has_zero_stats() {
        let dashboard = build_dashboard(&Workspace::default(), RECENT_PROJECTS, RECENT_TASKS);
        assert_eq!(dashboard.stats.active_projects, 0);
        assert_eq!(dashboard.stats.pending_tasks, 0);
        assert!(dashboard.recent_projects.is_empty());
        assert!(dashboard.recent_tasks.is_empty());
    }
}
