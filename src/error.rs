use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use derive_more::Display;
use serde_json::json;

/// Failures the core hands back to the HTTP boundary.
///
/// Every variant maps to a fixed status code and none of them leaves a
/// half-applied write behind; storage errors surface as
/// `StorageUnavailable` with the cause logged at the point of failure.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[display(fmt = "Username already exists")]
    DuplicateUsername,
    #[display(fmt = "Invalid username or password")]
    AuthFailure,
    #[display(fmt = "Access denied")]
    AccessDenied,
    #[display(fmt = "Invalid QR value")]
    InvalidToken,
    #[display(fmt = "Subject is not a staff member")]
    UnauthorizedSubject,
    #[display(fmt = "Record not found")]
    RecordNotFound,
    #[display(fmt = "Check-out must not be earlier than check-in")]
    InvalidTimeRange,
    #[display(fmt = "Storage backend unavailable")]
    StorageUnavailable,
    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl actix_web::ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DuplicateUsername => StatusCode::CONFLICT,
            ServiceError::AuthFailure => StatusCode::UNAUTHORIZED,
            ServiceError::AccessDenied => StatusCode::FORBIDDEN,
            ServiceError::InvalidToken => StatusCode::BAD_REQUEST,
            ServiceError::UnauthorizedSubject => StatusCode::FORBIDDEN,
            ServiceError::RecordNotFound => StatusCode::NOT_FOUND,
            ServiceError::InvalidTimeRange => StatusCode::BAD_REQUEST,
            ServiceError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => ServiceError::RecordNotFound,
            e => {
                tracing::error!(error = %e, "storage operation failed");
                ServiceError::StorageUnavailable
            }
        }
    }
}
