// member.rs

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;

use crate::app_state::AppState;
use crate::auth::current_session;
use crate::derive::member_workload;
use crate::error::AppResult;
use crate::forms::MemberForm;

// GET /members
// Team members with the number of open tasks assigned to each.
pub async fn list_members(req: HttpRequest, data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let ws = data.workspaces.read(&data.scope_for(&session)).await?;
    Ok(HttpResponse::Ok().json(member_workload(&ws.members, &ws.tasks)))
}

// POST /members
pub async fn create_member(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<MemberForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let draft = form.into_inner().validate()?;
    let member = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| Ok(ws.create_member(draft, Utc::now())))
        .await?;
    info!("Member added {}", member.id);
    Ok(HttpResponse::Ok().json(member))
}

// GET /members/{member_id}
pub async fn get_member(
    req: HttpRequest,
    data: web::Data<AppState>,
    member_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let ws = data.workspaces.read(&data.scope_for(&session)).await?;
    let member = ws.member(&member_id)?;
    let workload = member_workload(std::slice::from_ref(member), &ws.tasks).pop();
    Ok(HttpResponse::Ok().json(workload))
}

// PUT /members/{member_id}
pub async fn update_member(
    req: HttpRequest,
    data: web::Data<AppState>,
    member_id: web::Path<String>,
    form: web::Json<MemberForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let draft = form.into_inner().validate()?;
    let member = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| ws.update_member(&member_id, draft))
        .await?;
    Ok(HttpResponse::Ok().json(member))
}

// DELETE /members/{member_id}
// Tasks assigned to the member become unassigned.
pub async fn delete_member(
    req: HttpRequest,
    data: web::Data<AppState>,
    member_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let removed = data
        .workspaces
        .mutate(&data.scope_for(&session), |ws| ws.delete_member(&member_id))
        .await?;
    info!("Member removed {}", removed.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "Member removed", "id": removed.id })))
}
