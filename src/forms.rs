// src/forms.rs

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::derive::StatusFilter;
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::models::{Priority, ProjectStatus, TaskStatus, DEFAULT_PROJECT_COLOR};

pub const MIN_PASSWORD_LEN: usize = 6;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
    })
}

fn color_pattern() -> &'static Regex {
    static COLOR: OnceLock<Regex> = OnceLock::new();
    COLOR.get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("color pattern compiles"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Trims and lower-cases an address the way accounts are keyed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str, message: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, message);
    }
    value.to_string()
}

fn due_date(errors: &mut ValidationErrors, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        errors.add("dueDate", "Due date required");
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add("dueDate", "Due date must be YYYY-MM-DD");
            None
        }
    }
}

/// Empty strings from `<select>` elements mean "no reference".
fn reference(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a `?status=` query value; unknown statuses are a validation error.
pub fn status_filter<S: DeserializeOwned>(raw: Option<&str>) -> AppResult<StatusFilter<S>> {
    StatusFilter::from_query(raw)
        .ok_or_else(|| AppError::Validation(ValidationErrors::single("status", "Unknown status")))
}

// ─── ENTITY FORMS ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectForm {
    pub name: String,
    pub description: String,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub color: Option<String>,
    pub due_date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub color: String,
    pub due_date: NaiveDate,
}

impl ProjectForm {
    pub fn validate(self) -> AppResult<ProjectDraft> {
        let mut errors = ValidationErrors::new();
        let name = required(&mut errors, "name", &self.name, "Project name required");
        let due = due_date(&mut errors, &self.due_date);
        let color = reference(self.color)
            .unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string())
            .to_ascii_lowercase();
        if !color_pattern().is_match(&color) {
            errors.add("color", "Color must be a #rrggbb hex value");
        }
        match due {
            Some(due_date) if errors.is_empty() => Ok(ProjectDraft {
                name,
                description: self.description.trim().to_string(),
                status: self.status.unwrap_or(ProjectStatus::Planning),
                priority: self.priority.unwrap_or(Priority::Medium),
                color,
                due_date,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub project_id: Option<String>,
    pub due_date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub project_id: Option<String>,
    pub due_date: NaiveDate,
}

impl TaskForm {
    pub fn validate(self) -> AppResult<TaskDraft> {
        let mut errors = ValidationErrors::new();
        let title = required(&mut errors, "title", &self.title, "Task title required");
        let due = due_date(&mut errors, &self.due_date);
        match due {
            Some(due_date) if errors.is_empty() => Ok(TaskDraft {
                title,
                description: self.description,
                status: self.status.unwrap_or(TaskStatus::Todo),
                priority: self.priority.unwrap_or(Priority::Low),
                assignee: reference(self.assignee),
                project_id: reference(self.project_id),
                due_date,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskStatusForm {
    pub status: Option<TaskStatus>,
}

impl TaskStatusForm {
    pub fn validate(self) -> AppResult<TaskStatus> {
        self.status
            .ok_or_else(|| AppError::Validation(ValidationErrors::single("status", "Status required")))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberForm {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberDraft {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl MemberForm {
    pub fn validate(self) -> AppResult<MemberDraft> {
        let mut errors = ValidationErrors::new();
        let name = required(&mut errors, "name", &self.name, "Name required");
        let email = required(&mut errors, "email", &self.email, "Email required");
        if !email.is_empty() && !is_valid_email(&email) {
            errors.add("email", "Email is not a valid address");
        }
        errors.finish(MemberDraft {
            name,
            email,
            role: self.role.trim().to_string(),
        })
    }
}

// ─── ACCOUNT FORMS ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignupDraft {
    pub display_name: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(self) -> AppResult<SignupDraft> {
        let mut errors = ValidationErrors::new();
        let display_name = required(&mut errors, "name", &self.name, "Name required");
        let email = normalize_email(&self.email);
        if email.is_empty() {
            errors.add("email", "Email required");
        } else if !is_valid_email(&email) {
            errors.add("email", "Email is not a valid address");
        }
        check_new_password(&mut errors, "password", &self.password, &self.confirm_password);
        errors.finish(SignupDraft {
            display_name,
            email,
            password: self.password,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(self) -> AppResult<(String, String)> {
        let mut errors = ValidationErrors::new();
        let email = required(&mut errors, "email", &self.email, "Email required");
        if self.password.is_empty() {
            errors.add("password", "Password required");
        }
        errors.finish((normalize_email(&email), self.password))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileDraft {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl ProfileForm {
    pub fn validate(self) -> AppResult<ProfileDraft> {
        let mut errors = ValidationErrors::new();
        let email = self.email.map(|e| normalize_email(&e));
        if let Some(email) = &email {
            if !is_valid_email(email) {
                errors.add("email", "Email is not a valid address");
            }
        }
        let display_name = self.display_name.map(|n| n.trim().to_string());
        if matches!(&display_name, Some(n) if n.is_empty()) {
            errors.add("displayName", "Name required");
        }
        errors.finish(ProfileDraft {
            email,
            display_name,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChangeForm {
    /// Returns `(current, new)`.
    pub fn validate(self) -> AppResult<(String, String)> {
        let mut errors = ValidationErrors::new();
        if self.current_password.is_empty() {
            errors.add("currentPassword", "Current password required");
        }
        check_new_password(&mut errors, "newPassword", &self.new_password, &self.confirm_password);
        errors.finish((self.current_password, self.new_password))
    }
}

fn check_new_password(errors: &mut ValidationErrors, field: &'static str, password: &str, confirm: &str) {
    if password.len() < MIN_PASSWORD_LEN {
        errors.add(field, format!("Password must be at least {} characters", MIN_PASSWORD_LEN));
    }
    if password != confirm {
        errors.add("confirmPassword", "Passwords do not match");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_error(result: AppResult<impl std::fmt::Debug>, field: &str) -> String {
        match result {
            Err(AppError::Validation(errors)) => errors.get(field).unwrap_or_default().to_string(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn project_requires_name_and_due_date() {
        let form = ProjectForm {
            name: "   ".into(),
            ..Default::default()
        };
        let result = form.validate();
        assert!(matches!(&result, Err(AppError::Validation(e)) if e.get("dueDate").is_some()));
        assert_eq!(field_error(result, "name"), "Project name required");
    }

    #[test]
    fn project_defaults_status_and_priority() {
        let draft = ProjectForm {
            name: " Launch ".into(),
            due_date: "2025-06-01".into(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(draft.name, "Launch");
        assert_eq!(draft.status, ProjectStatus::Planning);
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.color, DEFAULT_PROJECT_COLOR);
    }

    #[test]
    fn project_color_must_be_hex() {
        let form = |color: &str| ProjectForm {
            name: "Launch".into(),
            due_date: "2025-06-01".into(),
            color: Some(color.into()),
            ..Default::default()
        };
        assert_eq!(form("#36B37E").validate().unwrap().color, "#36b37e");
        assert_eq!(field_error(form("teal").validate(), "color"), "Color must be a #rrggbb hex value");
        assert!(form("#fff").validate().is_err());
    }

    #[test]
    fn task_blank_references_become_none() {
        let draft = TaskForm {
            title: "Write tests".into(),
            due_date: "2025-06-01".into(),
            assignee: Some("".into()),
            project_id: Some(" p_1 ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(draft.assignee, None);
        assert_eq!(draft.project_id.as_deref(), Some("p_1"));
        assert_eq!(draft.status, TaskStatus::Todo);
    }

    #[test]
    fn task_rejects_bad_date() {
        let form = TaskForm {
            title: "x".into(),
            due_date: "15/03/2024".into(),
            ..Default::default()
        };
        assert_eq!(field_error(form.validate(), "dueDate"), "Due date must be YYYY-MM-DD");
    }

    #[test]
    fn member_requires_valid_email() {
        let form = MemberForm {
            name: "Alice".into(),
            email: "alice-at-example".into(),
            role: "Designer".into(),
        };
        assert_eq!(field_error(form.validate(), "email"), "Email is not a valid address");
    }

    #[test]
    fn signup_rejects_mismatched_passwords() {
        let form = SignupForm {
            name: "Alice".into(),
            email: "Alice@Example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
        };
        assert_eq!(field_error(form.validate(), "confirmPassword"), "Passwords do not match");
    }

    #[test]
    fn signup_normalizes_email() {
        let draft = SignupForm {
            name: "Alice".into(),
            email: " Alice@Example.com ".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(draft.email, "alice@example.com");
    }

    #[test]
    fn task_status_form_requires_status() {
        assert!(TaskStatusForm::default().validate().is_err());
        let parsed: TaskStatusForm = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(parsed.validate().unwrap(), TaskStatus::Done);
    }
}
