use std::collections::BTreeMap;
use std::fmt;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::models::EntityKind;
use crate::storage::StorageError;

pub type AppResult<T> = Result<T, AppError>;

/// Field-level messages collected while validating a form.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered")]
    DuplicateAccount,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} entry {1} not found")]
    NotFound(EntityKind, String),

    #[error("Invalid import document: {0}")]
    InvalidImport(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidImport(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::DuplicateAccount => StatusCode::CONFLICT,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Storage(_) | AppError::Token(_) | AppError::Hashing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(errors) => json!({
                "error": "validation",
                "fields": errors.fields,
            }),
            AppError::Storage(_) | AppError::Token(_) | AppError::Hashing(_) => {
                error!("{}", self);
                json!({ "error": "internal", "message": "Internal server error" })
            }
            other => json!({ "error": other.kind(), "message": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::DuplicateAccount => "duplicate_account",
            AppError::Unauthorized => "unauthorized",
            AppError::NotFound(..) => "not_found",
            AppError::InvalidImport(_) => "invalid_import",
            AppError::Storage(_) | AppError::Token(_) | AppError::Hashing(_) => "internal",
        }
    }
}
