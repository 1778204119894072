use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Response header carrying the machine-readable error code; read back by the metrics middleware.
pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Envelope shared by every error response: `{"success": false, "error": <status>, "message": "..."}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { success: false, error: status.as_u16(), message: message.into() }
    }
}

/// Render the envelope with `status` and tag the response with `code`.
pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let mut resp = (status, Json(ErrorBody::new(status, message))).into_response();
    if let Ok(val) = HeaderValue::from_str(code) {
        resp.headers_mut().insert(ERROR_CODE_HEADER, val);
    }
    resp
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest { code: &'static str, message: Option<String> },
    NotFound { code: &'static str },
    Unprocessable { code: &'static str, message: Option<String> },
    /// Pre-rendered failure from another layer (e.g. authorization) that keeps its own status and code.
    Status { status: StatusCode, code: &'static str, message: String },
    Internal { message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self { Self::Internal { message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str) -> Self { Self::BadRequest { code, message: None } }
    pub fn not_found() -> Self { Self::NotFound { code: "not_found" } }
    pub fn unprocessable(code: &'static str) -> Self { Self::Unprocessable { code, message: None } }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Status { status, .. } => *status,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            ApiError::BadRequest { code, message } => (code, message.unwrap_or_else(|| "bad request".into())),
            ApiError::NotFound { code } => (code, "resource not found".into()),
            ApiError::Unprocessable { code, message } => (code, message.unwrap_or_else(|| "unprocessable".into())),
            ApiError::Status { code, message, .. } => (code, message),
            // Internal details stay in the logs.
            ApiError::Internal { message } => {
                error!(detail = message.as_deref().unwrap_or("unspecified"), "internal server error");
                ("internal_error", "internal server error".into())
            }
        };
        error_response(status, code, message)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
