//! End-to-end tests: a mock backend on an ephemeral port, the gateway in
//! front of it, driven with reqwest.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use property_gateway::proxy::{AxumServer, ProxyConfig};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Debug, Clone)]
struct Seen {
    method: String,
    path: String,
    query: Option<String>,
    auth: Option<String>,
    content_type: Option<String>,
    body: Vec<u8>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

async fn mock_backend(State(log): State<Log>, headers: HeaderMap, req: Request) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(String::from);
    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    log.lock().unwrap().push(Seen {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        auth: header("authorization"),
        content_type: header("content-type"),
        body: body.clone(),
    });

    match (method.as_str(), path.as_str()) {
        // Collection without trailing slash redirects, like a FastAPI backend
        ("GET", "/api/properties") => (
            StatusCode::TEMPORARY_REDIRECT,
            [("location", "/api/properties/")],
        )
            .into_response(),
        ("GET", "/api/properties/") => Json(json!({ "data": [{ "id": 1 }] })).into_response(),
        ("GET", "/api/tenants/404") => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Tenant not found" })),
        )
            .into_response(),
        ("GET", "/api/maintenance/") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain")],
            "Internal Server Error",
        )
            .into_response(),
        ("POST", "/api/leases/") => (
            StatusCode::CREATED,
            [("content-type", "text/plain")],
            body,
        )
            .into_response(),
        ("GET", "/api/units") => Json(json!({ "query": query })).into_response(),
        ("GET", "/api/dashboard/owner") => {
            Json(json!({ "data": { "properties": 3 }, "role": "owner" })).into_response()
        }
        ("POST", "/api/auth/login") => {
            Json(json!({ "access_token": "tok123", "token_type": "bearer" })).into_response()
        }
        ("GET", "/api/auth/me") => Json(json!({ "data": { "email": "owner@example.com" } }))
            .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" }))).into_response(),
    }
}

struct Harness {
    gateway: String,
    log: Log,
    client: reqwest::Client,
    _server: AxumServer,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(ProxyConfig::default()).await
    }

    async fn start_with(config: ProxyConfig) -> Self {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(mock_backend).with_state(log.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let backend_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let config = ProxyConfig {
            backend_url: format!("http://{}", backend_addr),
            ..config
        };
        Self::with_backend(config, log).await
    }

    async fn with_backend(config: ProxyConfig, log: Log) -> Self {
        let config = ProxyConfig { port: 0, ..config };
        let (server, _handle) = AxumServer::start(config).await.unwrap();

        Self {
            gateway: server.base_url(),
            log,
            client: reqwest::Client::new(),
            _server: server,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.gateway, path)
    }

    fn seen(&self) -> Vec<Seen> {
        self.log.lock().unwrap().clone()
    }

    /// Send a request line as written, bypassing client-side path normalization
    async fn raw_get(&self, path: &str) -> String {
        let addr = self.gateway.trim_start_matches("http://");
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nAuthorization: Bearer abc\r\nConnection: close\r\n\r\n",
            path, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }
}

async fn json_of(resp: reqwest::Response) -> (u16, Value) {
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn unauthenticated_request_never_reaches_backend() {
    let h = Harness::start().await;
    let resp = h.client.get(h.url("/api/tenants/")).send().await.unwrap();

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({ "success": false, "error": "Unauthorized" }));
    assert!(h.seen().is_empty());
}

#[tokio::test]
async fn redirect_is_followed_with_auth_and_payload_unwrapped() {
    let h = Harness::start().await;
    let resp = h
        .client
        .get(h.url("/api/properties"))
        .header("Authorization", "abc")
        .send()
        .await
        .unwrap();

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": true, "data": [{ "id": 1 }] }));

    let seen = h.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].path, "/api/properties");
    assert_eq!(seen[1].path, "/api/properties/");
    assert!(seen
        .iter()
        .all(|s| s.auth.as_deref() == Some("Bearer abc")));
    assert!(seen
        .iter()
        .all(|s| s.content_type.as_deref() == Some("application/json")));
}

#[tokio::test]
async fn backend_error_detail_and_status_are_preserved() {
    let h = Harness::start().await;
    let resp = h
        .client
        .get(h.url("/api/tenants/404"))
        .header("Authorization", "Bearer abc")
        .send()
        .await
        .unwrap();

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({ "success": false, "error": "Tenant not found" }));
}

#[tokio::test]
async fn write_body_is_forwarded_byte_for_byte() {
    let h = Harness::start().await;
    let raw = "{\"zeta\": 1,  \"alpha\":[2,3], \"rent\": 1200.50}";
    let resp = h
        .client
        .post(h.url("/api/leases/"))
        .header("Authorization", "Bearer abc")
        .header("Content-Type", "application/json")
        .body(raw)
        .send()
        .await
        .unwrap();

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["zeta"], json!(1));

    let seen = h.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].body, raw.as_bytes());
}

#[tokio::test]
async fn plain_text_error_becomes_message() {
    let h = Harness::start().await;
    let resp = h
        .client
        .get(h.url("/api/maintenance/"))
        .header("Cookie", "token=legacy")
        .send()
        .await
        .unwrap();

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({ "success": false, "error": "Internal Server Error" })
    );
    assert_eq!(h.seen()[0].auth.as_deref(), Some("Bearer legacy"));
}

#[tokio::test]
async fn header_wins_over_cookie() {
    let h = Harness::start().await;
    h.client
        .get(h.url("/api/units"))
        .header("Authorization", "Bearer from-header")
        .header("Cookie", "auth_token=from-cookie")
        .send()
        .await
        .unwrap();

    assert_eq!(h.seen()[0].auth.as_deref(), Some("Bearer from-header"));
}

#[tokio::test]
async fn query_string_is_passed_through() {
    let h = Harness::start().await;
    let resp = h
        .client
        .get(h.url("/api/units?page=2&status=vacant"))
        .header("Cookie", "auth_token=t")
        .send()
        .await
        .unwrap();

    let (_, body) = json_of(resp).await;
    assert_eq!(body["data"]["query"], json!("page=2&status=vacant"));
    assert_eq!(h.seen()[0].query.as_deref(), Some("page=2&status=vacant"));
}

#[tokio::test]
async fn dashboard_keeps_raw_shape() {
    let h = Harness::start().await;
    let resp = h
        .client
        .get(h.url("/api/dashboard/owner"))
        .header("Authorization", "Bearer abc")
        .send()
        .await
        .unwrap();

    let (_, body) = json_of(resp).await;
    assert_eq!(
        body["data"],
        json!({ "data": { "properties": 3 }, "role": "owner" })
    );
}

#[tokio::test]
async fn unknown_resource_is_404_without_backend_call() {
    let h = Harness::start().await;
    let resp = h
        .client
        .get(h.url("/api/secrets/1"))
        .header("Authorization", "Bearer abc")
        .send()
        .await
        .unwrap();

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({ "success": false, "error": "Not found" }));
    assert!(h.seen().is_empty());
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let h = Harness::start().await;
    let resp = h
        .client
        .post(h.url("/api/auth/login"))
        .body(r#"{"email":"owner@example.com","password":"pw"}"#)
        .send()
        .await
        .unwrap();

    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap();
    assert!(cookie.starts_with("auth_token=tok123;"));
    assert!(cookie.contains("HttpOnly"));

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["token_type"], json!("bearer"));
    assert!(h.seen()[0].auth.is_none());
}

#[tokio::test]
async fn me_requires_auth_and_unwraps() {
    let h = Harness::start().await;
    let resp = h.client.get(h.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = h
        .client
        .get(h.url("/api/auth/me"))
        .header("Cookie", "auth_token=tok123")
        .send()
        .await
        .unwrap();
    let (_, body) = json_of(resp).await;
    assert_eq!(
        body,
        json!({ "success": true, "data": { "email": "owner@example.com" } })
    );
}

#[tokio::test]
async fn logout_clears_both_cookies() {
    let h = Harness::start().await;
    let resp = h.client.post(h.url("/api/auth/logout")).send().await.unwrap();

    let cookies: Vec<String> = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("auth_token=;")));
    assert!(cookies.iter().any(|c| c.starts_with("token=;")));
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

    let (_, body) = json_of(resp).await;
    assert_eq!(body, json!({ "success": true, "data": null }));
    assert!(h.seen().is_empty());
}

#[tokio::test]
async fn unreachable_backend_is_500() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = ProxyConfig {
        backend_url: dead,
        ..ProxyConfig::default()
    };
    let h = Harness::with_backend(config, Arc::new(Mutex::new(Vec::new()))).await;
    let resp = h
        .client
        .get(h.url("/api/payments/"))
        .header("Authorization", "Bearer abc")
        .send()
        .await
        .unwrap();

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 500);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_check() {
    let h = Harness::start().await;
    let resp = h.client.get(h.url("/healthz")).send().await.unwrap();
    let (status, body) = json_of(resp).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn dot_segments_cannot_escape_resource() {
    let h = Harness::start().await;
    for path in [
        "/api/properties/../secrets/1",
        "/api/properties/%2e%2e/secrets/1",
        "/api/properties/.%2E/.%2E/admin",
        "/api/tenants/./1",
    ] {
        let response = h.raw_get(path).await;
        assert!(response.starts_with("HTTP/1.1 404"), "{}: {}", path, response);
        assert!(
            response.ends_with(r#"{"success":false,"error":"Not found"}"#),
            "{}: {}",
            path,
            response
        );
    }
    assert!(h.seen().is_empty());
}

#[tokio::test]
async fn wrong_method_on_auth_route_is_enveloped() {
    let h = Harness::start().await;
    let resp = h.client.get(h.url("/api/auth/login")).send().await.unwrap();

    let (status, body) = json_of(resp).await;
    assert_eq!(status, 405);
    assert_eq!(body, json!({ "success": false, "error": "Method not allowed" }));

    let resp = h.client.delete(h.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 405);
    assert!(h.seen().is_empty());
}

#[tokio::test]
async fn oversized_body_is_413_envelope() {
    let h = Harness::start_with(ProxyConfig {
        max_body_bytes: 16,
        ..ProxyConfig::default()
    })
    .await;
    let payload = format!("{{\"notes\":\"{}\"}}", "x".repeat(64));

    for path in ["/api/leases/", "/api/auth/login"] {
        let resp = h
            .client
            .post(h.url(path))
            .header("Authorization", "Bearer abc")
            .header("Content-Type", "application/json")
            .body(payload.clone())
            .send()
            .await
            .unwrap();

        let (status, body) = json_of(resp).await;
        assert_eq!(status, 413, "{}", path);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].is_string());
    }
    assert!(h.seen().is_empty());
}
