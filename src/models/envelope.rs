use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;

/// Uniform `{ success, data | error }` body returned to the browser
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success { success: bool, data: Value },
    Failure { success: bool, error: String },
}

/// Result of one proxied call, produced once per request
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub http_status: u16,
}

impl ProxyResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            http_status: StatusCode::OK.as_u16(),
        }
    }

    pub fn error(http_status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            http_status,
        }
    }

    pub fn unauthorized() -> Self {
        Self::error(StatusCode::UNAUTHORIZED.as_u16(), "Unauthorized")
    }

    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND.as_u16(), "Not found")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), message)
    }

    pub fn envelope(&self) -> Envelope {
        if self.success {
            Envelope::Success {
                success: true,
                data: self.data.clone().unwrap_or(Value::Null),
            }
        } else {
            Envelope::Failure {
                success: false,
                error: self.error.clone().unwrap_or_default(),
            }
        }
    }

    /// Outbound status: 200 on success, the backend status otherwise
    pub fn status_code(&self) -> StatusCode {
        if self.success {
            return StatusCode::OK;
        }
        StatusCode::from_u16(self.http_status)
            .ok()
            .filter(|s| !s.is_informational() && !s.is_success())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.envelope())).into_response()
    }
}
