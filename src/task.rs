// src/task.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{debug, info};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_session;
use crate::derive::{filter_by_status, resolve_task, resolve_tasks};
use crate::error::AppResult;
use crate::forms::{status_filter, TaskForm, TaskStatusForm};
use crate::models::TaskStatus;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub status: Option<String>,
    pub project_id: Option<String>,
}

/// GET /tasks
pub async fn list_tasks(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<TaskQuery>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let filter = status_filter::<TaskStatus>(query.status.as_deref())?;
    let ws = data.workspaces.read(&data.scope_for(&session)).await?;
    let mut tasks = filter_by_status(&ws.tasks, filter);
    if let Some(project_id) = query.project_id.as_deref().filter(|p| !p.is_empty()) {
        tasks.retain(|t| t.project_id.as_deref() == Some(project_id));
    }
    Ok(HttpResponse::Ok().json(resolve_tasks(&tasks, &ws.projects, &ws.members)))
}

/// POST /tasks
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<TaskForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    debug!("Received create_task payload: {:?}", form);
    let draft = form.into_inner().validate()?;
    let task = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| ws.create_task(draft, Utc::now()))
        .await?;
    info!("Task created {}", task.id);
    Ok(HttpResponse::Ok().json(task))
}

/// GET /tasks/{task_id}
pub async fn get_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let ws = data.workspaces.read(&data.scope_for(&session)).await?;
    let task = ws.task(&task_id)?;
    Ok(HttpResponse::Ok().json(resolve_task(task, &ws.projects, &ws.members)))
}

/// PUT /tasks/{task_id}
pub async fn update_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    form: web::Json<TaskForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let draft = form.into_inner().validate()?;
    let task = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| ws.update_task(&task_id, draft))
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// PUT /tasks/{task_id}/status
/// Used by the checkbox on task rows.
pub async fn set_task_status(
    req: HttpRequest,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    form: web::Json<TaskStatusForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let status = form.into_inner().validate()?;
    let task = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| ws.set_task_status(&task_id, status))
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// DELETE /tasks/{task_id}
pub async fn delete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let removed = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| ws.delete_task(&task_id))
        .await?;
    info!("Task deleted {}", removed.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "Task deleted", "id": removed.id })))
}
