use application::{ApplicationError, ErrorKind};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        match error.kind() {
            ErrorKind::NotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", error.to_string())
            }
            ErrorKind::NoMatchFound => ApiError::new(
                StatusCode::NOT_FOUND,
                "NO_MATCH_FOUND",
                "no compatible user nearby",
            ),
            ErrorKind::Unauthorized => {
                ApiError::new(StatusCode::FORBIDDEN, "NOT_PARTICIPANT", error.to_string())
            }
            ErrorKind::InvalidState => {
                ApiError::new(StatusCode::CONFLICT, "INVALID_STATE", error.to_string())
            }
            ErrorKind::InvalidInput => {
                ApiError::new(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", error.to_string())
            }
            ErrorKind::Authentication => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                "authentication failed",
            ),
            ErrorKind::Transient => {
                tracing::warn!(error = %error, "transient failure while serving request");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "storage temporarily unavailable, retry later",
                )
            }
            ErrorKind::Internal => {
                tracing::error!(error = %error, "internal failure while serving request");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal server error",
                )
            }
        }
    }
}

impl ApiError {
    /// 提取器拒绝请求时沿用其状态码
    fn rejected(status: StatusCode, message: String) -> Self {
        let code = if status.is_server_error() {
            "INTERNAL_ERROR"
        } else {
            "INVALID_ARGUMENT"
        };
        ApiError::new(status, code, message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
