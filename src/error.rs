use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    ValidationError(String),
    InvalidOperation(String),
    CapacityExceeded(String),
    HasChildren(String),
    ReadOnly(String),
    Conflict(String),
    UpstreamFailure(String),
    DatabaseError(sqlx::Error),
    ConfigError(config::ConfigError),
    IoError(std::io::Error),
    InternalServerError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            AppError::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {}", msg),
            AppError::HasChildren(msg) => write!(f, "Has children: {}", msg),
            AppError::ReadOnly(msg) => write!(f, "Read only: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::UpstreamFailure(msg) => write!(f, "Upstream failure: {}", msg),
            AppError::DatabaseError(err) => write!(f, "Database error: {}", err),
            AppError::ConfigError(err) => write!(f, "Configuration error: {}", err),
            AppError::IoError(err) => write!(f, "IO error: {}", err),
            AppError::InternalServerError(msg) => write!(f, "Internal server error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidOperation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::CapacityExceeded(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::HasChildren(msg) => (StatusCode::CONFLICT, msg),
            AppError::ReadOnly(msg) => (StatusCode::CONFLICT, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::UpstreamFailure(ref msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::DatabaseError(ref err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::ConfigError(ref err) => {
                tracing::error!("Config error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error occurred".to_string(),
                )
            }
            AppError::IoError(ref err) => {
                tracing::error!("IO error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO error occurred".to_string(),
                )
            }
            AppError::InternalServerError(ref msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("Document serialization failed: {}", err))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::InternalServerError(format!("Migration failed: {}", err))
    }
}

impl From<crate::models::pack_list::TransitionError> for AppError {
    fn from(err: crate::models::pack_list::TransitionError) -> Self {
        AppError::InvalidOperation(err.to_string())
    }
}

impl From<crate::services::container_tree::TreeError> for AppError {
    fn from(err: crate::services::container_tree::TreeError) -> Self {
        use crate::services::container_tree::TreeError;
        match err {
            TreeError::ContainerNotFound(id) => {
                AppError::NotFound(format!("Container {} not found", id))
            }
            TreeError::ParentNotFound(id) => {
                AppError::NotFound(format!("Parent container {} not found", id))
            }
            cycle @ (TreeError::WouldCycle { .. } | TreeError::ParentCycle(_)) => {
                AppError::InvalidOperation(cycle.to_string())
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
