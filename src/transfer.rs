// src/transfer.rs

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::auth::current_session;
use crate::error::{AppError, AppResult};
use crate::models::{Member, Project, Task};
use crate::storage::StorageError;
use crate::workspace::Workspace;

pub const SCHEMA_VERSION: u32 = 1;
const EXPORT_FILENAME: &str = "projectflow-export.json";

/// Whole-scope backup document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub members: Vec<Member>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ExportDocument {
    pub fn new(ws: Workspace, exported_at: DateTime<Utc>) -> Self {
        ExportDocument {
            schema_version: SCHEMA_VERSION,
            exported_at: Some(exported_at),
            projects: ws.projects,
            tasks: ws.tasks,
            members: ws.members,
        }
    }

    /// Parses and checks an uploaded document without storing anything.
    pub fn parse(raw: &[u8]) -> AppResult<(Workspace, usize)> {
        let doc: ExportDocument =
            serde_json::from_slice(raw).map_err(|e| AppError::InvalidImport(e.to_string()))?;
        if doc.schema_version > SCHEMA_VERSION {
            return Err(AppError::InvalidImport(format!(
                "unsupported schemaVersion {}",
                doc.schema_version
            )));
        }
        let mut ws = Workspace {
            projects: doc.projects,
            tasks: doc.tasks,
            members: doc.members,
        };
        let cleared = ws.sanitize_for_import()?;
        Ok((ws, cleared))
    }
}

/// GET /export
pub async fn export_data(req: HttpRequest, data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let ws = data.workspaces.read(&data.scope_for(&session)).await?;
    let body = serde_json::to_string_pretty(&ExportDocument::new(ws, Utc::now()))
        .map_err(StorageError::from)?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
        ))
        .body(body))
}

/// POST /import
/// Replaces every collection of the scope with the uploaded document.
pub async fn import_data(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let (ws, cleared) = ExportDocument::parse(&body).map_err(|e| {
        warn!("Import rejected for {}: {}", session.user.user_id, e);
        e
    })?;
    let scope = data.scope_for(&session);
    data.workspaces.replace(&scope, &ws).await?;
    info!(
        "Imported {} projects, {} tasks, {} members into {} ({} dangling references cleared)",
        ws.projects.len(),
        ws.tasks.len(),
        ws.members.len(),
        scope,
        cleared
    );
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "Import complete",
        "projects": ws.projects.len(),
        "tasks": ws.tasks.len(),
        "members": ws.members.len(),
        "clearedReferences": cleared,
    })))
}
