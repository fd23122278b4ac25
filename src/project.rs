// src/project.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::auth::current_session;
use crate::derive::{filter_by_status, project_summaries, project_summary, resolve_tasks, ProjectSummary, TaskView};
use crate::error::AppResult;
use crate::forms::{status_filter, ProjectForm};
use crate::models::ProjectStatus;

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub summary: ProjectSummary,
    pub tasks: Vec<TaskView>,
}

/// GET /projects
/// Lists the scope's projects with progress, optionally filtered by status.
pub async fn list_projects(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<ProjectQuery>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let filter = status_filter::<ProjectStatus>(query.status.as_deref())?;
    let ws = data.workspaces.read(&data.scope_for(&session)).await?;
    let projects = filter_by_status(&ws.projects, filter);
    Ok(HttpResponse::Ok().json(project_summaries(&projects, &ws.tasks)))
}

/// POST /projects
pub async fn create_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<ProjectForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    debug!("Received create_project payload: {:?}", form);
    let draft = form.into_inner().validate()?;
    let project = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| Ok(ws.create_project(draft, Utc::now())))
        .await?;
    info!("Project created {}", project.id);
    Ok(HttpResponse::Ok().json(project))
}

/// GET /projects/{project_id}
/// The project with its progress and its tasks.
pub async fn get_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let ws = data.workspaces.read(&data.scope_for(&session)).await?;
    let project = ws.project(&project_id)?;
    let own: Vec<_> = ws
        .tasks
        .iter()
        .filter(|t| t.project_id.as_deref() == Some(project.id.as_str()))
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(ProjectDetail {
        summary: project_summary(project, &ws.tasks),
        tasks: resolve_tasks(&own, &ws.projects, &ws.members),
    }))
}

/// PUT /projects/{project_id}
pub async fn update_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
    form: web::Json<ProjectForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let draft = form.into_inner().validate()?;
    let project = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| ws.update_project(&project_id, draft))
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// DELETE /projects/{project_id}
/// Tasks of the project go with it.
pub async fn delete_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let removed = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| ws.delete_project(&project_id))
        .await?;
    info!("Project deleted {}", removed.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "Project deleted", "id": removed.id })))
}
