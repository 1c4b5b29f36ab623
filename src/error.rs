use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::{error, warn};

use crate::{db::StoreError, workflow::WorkflowError};

/// Error returned by request handlers, rendered as `{ "message": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database operation timed out")]
    Timeout,

    #[error("Something went wrong, contact the system administrator")]
    Internal,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockConflict => {
                AppError::Conflict("Record is locked by another request, retry".into())
            }
            StoreError::Duplicate(detail) => {
                warn!(%detail, "Duplicate entry rejected");
                AppError::Conflict("Record already exists".into())
            }
            StoreError::Referenced => {
                AppError::Conflict("Record is still referenced by other records".into())
            }
            StoreError::Timeout(limit) => {
                warn!(limit_ms = limit.as_millis() as u64, "Store operation timed out");
                AppError::Timeout
            }
            other => {
                error!(error = %other, "Store operation failed");
                AppError::Internal
            }
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::DepartmentNotSelected
            | WorkflowError::AccountNotAssigned
            | WorkflowError::AccountInactive
            | WorkflowError::AlreadyInDepartment => AppError::BadRequest(message),
            WorkflowError::DepartmentNotFound
            | WorkflowError::AccountNotFound
            | WorkflowError::EmployeeNotFound
            | WorkflowError::TargetDepartmentNotFound => AppError::NotFound(message),
            WorkflowError::AccountAlreadyAssigned
            | WorkflowError::DuplicateEmployeeId
            | WorkflowError::TransferConflict => AppError::Conflict(message),
            WorkflowError::Store(StoreError::LockConflict) => AppError::Conflict(
                WorkflowError::TransferConflict.to_string(),
            ),
            WorkflowError::Store(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_keys().map(|f| f.to_string()).collect();
        fields.sort();
        AppError::BadRequest(format!("Invalid value for: {}", fields.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn workflow_preconditions_keep_their_message_and_status() {
        let err: AppError = WorkflowError::AccountInactive.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Only active accounts can be assigned to employees");

        let err: AppError = WorkflowError::TargetDepartmentNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: AppError = WorkflowError::TransferConflict.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn lock_wait_inside_a_transfer_reads_as_transfer_conflict() {
        let err: AppError = WorkflowError::Store(StoreError::LockConflict).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "Employee is being transferred by another request, retry"
        );
    }

    #[test]
    fn store_timeout_is_service_unavailable() {
        let err: AppError = StoreError::Timeout(Duration::from_secs(10)).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "Database operation timed out");
    }

    #[test]
    fn unexpected_store_errors_hide_details() {
        let err: AppError = StoreError::Database(sqlx::Error::PoolClosed).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("pool"));
    }
}
