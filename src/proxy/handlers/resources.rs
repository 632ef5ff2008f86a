// Resource CRUD handlers
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension, RawQuery, State},
    http::{Method, Uri},
};

use crate::models::ProxyResponse;
use crate::proxy::common::{proxy_to_backend, RouteOptions};
use crate::proxy::middleware::ResolvedAuth;
use crate::proxy::server::AppState;
use crate::proxy::upstream::ProxyRequest;

/// Backend resources reachable through `/api/<resource>/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Properties,
    Units,
    Tenants,
    Leases,
    Payments,
    Maintenance,
    Users,
    Staff,
    Notifications,
    /// Role dashboards, e.g. `/api/dashboard/owner`
    Dashboard,
}

impl Resource {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "properties" => Some(Self::Properties),
            "units" => Some(Self::Units),
            "tenants" => Some(Self::Tenants),
            "leases" => Some(Self::Leases),
            "payments" => Some(Self::Payments),
            "maintenance" => Some(Self::Maintenance),
            "users" => Some(Self::Users),
            "staff" => Some(Self::Staff),
            "notifications" => Some(Self::Notifications),
            "dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }

    pub fn options(self) -> RouteOptions {
        match self {
            // Dashboard summaries mix `data` with sibling counters
            Self::Dashboard => RouteOptions::PROTECTED_RAW,
            _ => RouteOptions::PROTECTED,
        }
    }
}

/// True when any segment is `.` or `..`, raw or percent-encoded. The backend
/// URL is resolved by `url`, which would collapse such segments and escape
/// the resource prefix.
fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| match urlencoding::decode(segment) {
        // `url` also treats `\` as a separator for http(s)
        Ok(decoded) => decoded
            .split(['/', '\\'])
            .any(|part| part == "." || part == ".."),
        Err(_) => true,
    })
}

/// Router fallback: `/api/<resource>`, `/api/<resource>/` and deeper paths
pub async fn handle_resource(
    State(state): State<AppState>,
    Extension(ResolvedAuth(auth_token)): Extension<ResolvedAuth>,
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> ProxyResponse {
    let Some(rest) = uri.path().strip_prefix("/api/") else {
        return ProxyResponse::not_found();
    };
    if has_dot_segment(rest) {
        tracing::warn!("Rejected dot segment in path: {}", uri.path());
        return ProxyResponse::not_found();
    }
    let segment = rest.split('/').next().unwrap_or_default();
    let Some(resource) = Resource::from_segment(segment) else {
        tracing::debug!("Unknown resource: {}", segment);
        return ProxyResponse::not_found();
    };

    let body = match super::read_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    // Path is forwarded verbatim, trailing slash included
    let request = ProxyRequest {
        method,
        path: state.config.backend_path(rest),
        query,
        auth_token,
        body: (!body.is_empty()).then_some(body),
    };

    proxy_to_backend(&state.upstream, resource.options(), request).await
}
