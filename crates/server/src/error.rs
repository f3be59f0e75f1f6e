use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{
        capability::CapabilityError, collection_visit::VisitError, task::TaskError,
        task_assignment::AssignmentError, user::UserError, waste_report::ReportError,
    },
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Visit(#[from] VisitError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Capability(err) => match err {
                CapabilityError::NotFound
                | CapabilityError::EnterpriseNotFound
                | CapabilityError::AreaNotFound
                | CapabilityError::WasteTypeNotFound => (StatusCode::NOT_FOUND, "CapabilityError"),
                CapabilityError::ValidationError(_) => (StatusCode::BAD_REQUEST, "CapabilityError"),
                CapabilityError::DuplicateCapability
                | CapabilityError::Inactive
                | CapabilityError::CapacityExceeded { .. } => {
                    (StatusCode::CONFLICT, "CapabilityError")
                }
                CapabilityError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CapabilityError")
                }
            },
            ApiError::Task(err) => match err {
                TaskError::NotFound
                | TaskError::ReportNotFound
                | TaskError::EnterpriseNotFound => (StatusCode::NOT_FOUND, "TaskError"),
                TaskError::InvalidReportState(_) | TaskError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "TaskError")
                }
                TaskError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::Assignment(err) => match err {
                AssignmentError::NotFound
                | AssignmentError::TaskNotFound
                | AssignmentError::CollectorNotFound => (StatusCode::NOT_FOUND, "AssignmentError"),
                AssignmentError::NotACollector => (StatusCode::BAD_REQUEST, "AssignmentError"),
                AssignmentError::AssignmentConflict
                | AssignmentError::TaskNotAssignable(_)
                | AssignmentError::InvalidState(_) => (StatusCode::CONFLICT, "AssignmentError"),
                AssignmentError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "AssignmentError")
                }
            },
            ApiError::Visit(err) => match err {
                VisitError::NotFound
                | VisitError::TaskNotFound
                | VisitError::WasteTypeNotFound => (StatusCode::NOT_FOUND, "VisitError"),
                VisitError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VisitError"),
                VisitError::TaskNotAssignable(_)
                | VisitError::CollectorMismatch
                | VisitError::OpenVisitExists
                | VisitError::VisitClosed
                | VisitError::VisitOpen => (StatusCode::CONFLICT, "VisitError"),
                VisitError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "VisitError"),
            },
            ApiError::User(err) => match err {
                UserError::NotFound => (StatusCode::NOT_FOUND, "UserError"),
                UserError::ValidationError(_) => (StatusCode::BAD_REQUEST, "UserError"),
                UserError::EmailTaken | UserError::InvalidState(_) => {
                    (StatusCode::CONFLICT, "UserError")
                }
                UserError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Report(err) => match err {
                ReportError::NotFound
                | ReportError::ReporterNotFound
                | ReportError::AreaNotFound
                | ReportError::WasteTypeNotFound => (StatusCode::NOT_FOUND, "ReportError"),
                ReportError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ReportError"),
                ReportError::InvalidState(_) => (StatusCode::CONFLICT, "ReportError"),
                ReportError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ReportError"),
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use db::types::TaskStatus;

    use super::*;

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("conflict".to_string())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("boom".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_errors_map_to_expected_http_statuses() {
        assert_eq!(
            ApiError::from(CapabilityError::CapacityExceeded {
                requested: 20.0,
                available: 5.0,
            })
            .into_response()
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CapabilityError::NotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TaskError::InvalidTransition {
                from: TaskStatus::Completed,
                to: TaskStatus::Pending,
            })
            .into_response()
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AssignmentError::AssignmentConflict)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(VisitError::VisitClosed)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(UserError::EmailTaken)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(UserError::ValidationError("bad".to_string()))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
