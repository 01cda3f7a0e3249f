use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

/// Error body shown to the dentist as a transient notification.
#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub title: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    BadGateway(&'static str, String),
    Unavailable(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                title: title_for(code).to_string(),
                message: message.to_string(),
            },
        })
    }
}

fn title_for(code: &str) -> &'static str {
    match code {
        "VALIDATION_ERROR" => "Missing information",
        "TRANSITION_FAILED" => "Update failed",
        "FETCH_FAILED" => "Failed to load",
        "NOT_FOUND" => "Not found",
        "FORBIDDEN" => "Access denied",
        "SESSION_EXPIRED" => "Signed out",
        _ => "Error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Forbidden(code, msg) => {
                (StatusCode::FORBIDDEN, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadGateway(code, msg) => {
                (StatusCode::BAD_GATEWAY, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Unavailable(code, msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::to_error_response(code, &msg),
            )
                .into_response(),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::to_error_response("INTERNAL", &msg),
            )
                .into_response(),
        }
    }
}

/// Failures raised by the dashboard services.
///
/// `Fetch` leaves prior state untouched, `Transition` means the store refused a
/// write and nothing local was advanced, `Validation` is raised before any
/// store call is issued.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("{0}")]
    Fetch(String),
    #[error("{0}")]
    Transition(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    External(String),
    #[error("{0}")]
    Unavailable(String),
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::Fetch(m) => ApiError::BadGateway("FETCH_FAILED", m),
            DashboardError::Transition(m) => ApiError::Conflict("TRANSITION_FAILED", m),
            DashboardError::Validation(m) => ApiError::BadRequest("VALIDATION_ERROR", m),
            DashboardError::NotFound(m) => ApiError::NotFound("NOT_FOUND", m),
            DashboardError::Forbidden(m) => ApiError::Forbidden("FORBIDDEN", m),
            DashboardError::External(m) => ApiError::BadGateway("EXTERNAL_SERVICE_FAILED", m),
            DashboardError::Unavailable(m) => ApiError::Unavailable("NOT_CONFIGURED", m),
        }
    }
}
