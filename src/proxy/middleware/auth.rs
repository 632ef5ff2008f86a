// Auth token resolution middleware
use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::fmt;
use tracing::Instrument;

/// Primary cookie carrying the bearer token
pub const AUTH_COOKIE: &str = "auth_token";
/// Legacy alias still set by older clients
pub const LEGACY_AUTH_COOKIE: &str = "token";

const BEARER_PREFIX: &str = "Bearer ";

/// Normalized `Bearer <token>` credential. Never printed in plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Normalize a raw header or cookie value; empty values yield `None`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(secret) = raw.strip_prefix(BEARER_PREFIX) {
            if secret.trim().is_empty() {
                return None;
            }
            return Some(Self(raw.to_string()));
        }
        // "Bearer" alone, no credential after it
        if raw == BEARER_PREFIX.trim_end() {
            return None;
        }
        Some(Self(format!("{}{}", BEARER_PREFIX, raw)))
    }

    /// Full `Authorization` header value
    pub fn header_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(Bearer ***)")
    }
}

/// Token resolved for the current request, stored as a request extension
#[derive(Debug, Clone, Default)]
pub struct ResolvedAuth(pub Option<AuthToken>);

/// Resolve the caller's credential: `Authorization` header first, then the
/// primary cookie, then the legacy cookie.
pub fn resolve_auth_token(headers: &HeaderMap) -> Option<AuthToken> {
    // HeaderMap lookups are case-insensitive; an empty header counts as absent
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(AuthToken::from_raw);
    if from_header.is_some() {
        return from_header;
    }

    find_cookie(headers, AUTH_COOKIE)
        .or_else(|| find_cookie(headers, LEGACY_AUTH_COOKIE))
        .and_then(|value| AuthToken::from_raw(&value))
}

/// Look up a cookie value across every `Cookie` header
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookie_str| cookie_str.split(';'))
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) if key.trim() == name && !value.trim().is_empty() => {
                    Some(value.trim().to_string())
                }
                _ => None,
            }
        })
}

/// Resolves the token once and hands it to handlers via `ResolvedAuth`.
/// Everything logged while handling the request carries a request id.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let token = resolve_auth_token(request.headers());
    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let span = tracing::info_span!("request", id = %request_id);

    span.in_scope(|| {
        tracing::info!(
            method = %request.method(),
            uri = %request.uri(),
            has_auth = token.is_some(),
            "Request"
        )
    });

    request.extensions_mut().insert(ResolvedAuth(token));
    next.run(request).instrument(span).await
}
