// API endpoint handlers
pub mod auth;
pub mod resources;

use axum::{body::Bytes, extract::rejection::BytesRejection};

use crate::models::ProxyResponse;

/// Body extraction failures (e.g. over the size limit) as an error envelope
pub(crate) fn read_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, ProxyResponse> {
    body.map_err(|rejection| {
        tracing::warn!("Rejected request body: {}", rejection);
        ProxyResponse::error(rejection.status().as_u16(), rejection.body_text())
    })
}

/// Method fallback for the fixed routes
pub async fn handle_method_not_allowed() -> ProxyResponse {
    ProxyResponse::error(405, "Method not allowed")
}
