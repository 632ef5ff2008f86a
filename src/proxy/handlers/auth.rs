// Auth handlers: login/register/me forward to the backend, logout is local
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension, RawQuery, State},
    http::{header, Method},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde_json::Value;

use crate::models::ProxyResponse;
use crate::proxy::common::{proxy_to_backend, RouteOptions};
use crate::proxy::middleware::auth::{AUTH_COOKIE, LEGACY_AUTH_COOKIE};
use crate::proxy::middleware::ResolvedAuth;
use crate::proxy::server::AppState;
use crate::proxy::upstream::ProxyRequest;

fn build_request(
    state: &AppState,
    method: Method,
    endpoint: &str,
    query: Option<String>,
    auth: ResolvedAuth,
    body: Option<Bytes>,
) -> ProxyRequest {
    ProxyRequest {
        method,
        path: state.config.backend_path(endpoint),
        query,
        auth_token: auth.0,
        body,
    }
}

/// Token issued by a login payload, if any
fn issued_token(data: &Value) -> Option<&str> {
    ["access_token", "token"]
        .iter()
        .filter_map(|key| data.get(*key))
        .find_map(Value::as_str)
        .filter(|t| !t.trim().is_empty())
}

fn session_cookie(name: &str, value: &str, max_age: Option<u64>, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if let Some(age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", age));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub async fn handle_login(
    State(state): State<AppState>,
    Extension(auth): Extension<ResolvedAuth>,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match super::read_body(body) {
        Ok(body) => body,
        Err(resp) => return resp.into_response(),
    };
    let request = build_request(&state, Method::POST, "auth/login", query, auth, Some(body));
    let resp = proxy_to_backend(&state.upstream, RouteOptions::PUBLIC_RAW, request).await;

    let token = resp
        .data
        .as_ref()
        .filter(|_| resp.success)
        .and_then(|data| issued_token(data).or_else(|| data.get("data").and_then(issued_token)))
        .map(str::to_owned);

    match token {
        Some(token) => {
            tracing::info!("Login succeeded, session cookie issued");
            let cookie = session_cookie(AUTH_COOKIE, &token, None, state.config.secure_cookies);
            ([(header::SET_COOKIE, cookie)], resp).into_response()
        }
        None => resp.into_response(),
    }
}

pub async fn handle_register(
    State(state): State<AppState>,
    Extension(auth): Extension<ResolvedAuth>,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> ProxyResponse {
    let body = match super::read_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let request = build_request(&state, Method::POST, "auth/register", query, auth, Some(body));
    proxy_to_backend(&state.upstream, RouteOptions::PUBLIC_RAW, request).await
}

pub async fn handle_me(
    State(state): State<AppState>,
    Extension(auth): Extension<ResolvedAuth>,
    RawQuery(query): RawQuery,
) -> ProxyResponse {
    let request = build_request(&state, Method::GET, "auth/me", query, auth, None);
    proxy_to_backend(&state.upstream, RouteOptions::PROTECTED, request).await
}

/// Clears both cookie names; the backend keeps no session to end
pub async fn handle_logout(State(state): State<AppState>) -> Response {
    let secure = state.config.secure_cookies;
    (
        AppendHeaders([
            (header::SET_COOKIE, session_cookie(AUTH_COOKIE, "", Some(0), secure)),
            (
                header::SET_COOKIE,
                session_cookie(LEGACY_AUTH_COOKIE, "", Some(0), secure),
            ),
        ]),
        ProxyResponse::ok(Value::Null),
    )
        .into_response()
}
