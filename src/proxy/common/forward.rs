// Shared proxy pipeline used by every route:
// auth check -> forward (one redirect hop at most) -> normalize

use crate::models::ProxyResponse;
use crate::proxy::mappers::backend::normalize_response;
use crate::proxy::upstream::{BackendClient, ProxyRequest};

/// Per-route behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOptions {
    /// Reject with 401 before contacting the backend when no token resolved
    pub auth_required: bool,
    /// Collapse `{ "data": ... }` nesting in successful bodies
    pub unwrap: bool,
}

impl RouteOptions {
    pub const PROTECTED: Self = Self {
        auth_required: true,
        unwrap: true,
    };
    pub const PROTECTED_RAW: Self = Self {
        auth_required: true,
        unwrap: false,
    };
    pub const PUBLIC_RAW: Self = Self {
        auth_required: false,
        unwrap: false,
    };
}

/// Run one browser call through the backend. Never fails: every error
/// becomes an error envelope.
pub async fn proxy_to_backend(
    upstream: &BackendClient,
    options: RouteOptions,
    request: ProxyRequest,
) -> ProxyResponse {
    if options.auth_required && request.auth_token.is_none() {
        tracing::warn!(
            method = %request.method,
            path = %request.path,
            "Rejected request without credentials"
        );
        return ProxyResponse::unauthorized();
    }

    let response = match upstream.forward(&request).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                method = %request.method,
                path = %request.path,
                "Backend request failed: {}",
                e
            );
            return ProxyResponse::internal("Failed to reach backend service");
        }
    };

    match normalize_response(response, options.unwrap).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(path = %request.path, "Failed to read backend response: {}", e);
            ProxyResponse::internal("Failed to read backend response")
        }
    }
}
