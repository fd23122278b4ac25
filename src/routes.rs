// src/routes.rs

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};

use crate::auth::{change_password, login, logout, session, signup, update_user};
use crate::dashboard::get_dashboard;
use crate::error::{AppError, ValidationErrors};
use crate::member::{create_member, delete_member, get_member, list_members, update_member};
use crate::project::{create_project, delete_project, get_project, list_projects, update_project};
use crate::task::{create_task, delete_task, get_task, list_tasks, set_task_status, update_task};
use crate::transfer::{export_data, import_data};
use crate::ws::ws_index;

/// Malformed JSON bodies answer with the same shape as form validation.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(ValidationErrors::single("body", err.to_string())).into()
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/health", web::get().to(health))
        .service(
            web::scope("/auth")
                .route("/signup", web::post().to(signup))
                .route("/login", web::post().to(login))
                .route("/logout", web::post().to(logout))
                .route("/session", web::get().to(session))
                .route("/user", web::put().to(update_user))
                .route("/password", web::put().to(change_password)),
        )
        // PROJECTS
        .service(
            web::scope("/projects")
                .route("", web::get().to(list_projects))
                .route("", web::post().to(create_project))
                .route("/{project_id}", web::get().to(get_project))
                .route("/{project_id}", web::put().to(update_project))
                .route("/{project_id}", web::delete().to(delete_project)),
        )
        // TASKS
        .service(
            web::scope("/tasks")
                .route("", web::get().to(list_tasks))
                .route("", web::post().to(create_task))
                .route("/{task_id}", web::get().to(get_task))
                .route("/{task_id}", web::put().to(update_task))
                .route("/{task_id}", web::delete().to(delete_task))
                .route("/{task_id}/status", web::put().to(set_task_status)),
        )
        // MEMBERS
        .service(
            web::scope("/members")
                .route("", web::get().to(list_members))
                .route("", web::post().to(create_member))
                .route("/{member_id}", web::get().to(get_member))
                .route("/{member_id}", web::put().to(update_member))
                .route("/{member_id}", web::delete().to(delete_member)),
        )
        .route("/dashboard", web::get().to(get_dashboard))
        .route("/export", web::get().to(export_data))
        .route("/import", web::post().to(import_data))
        // WEBSOCKET route for change notifications
        .service(web::resource("/ws").route(web::get().to(ws_index)));
}
