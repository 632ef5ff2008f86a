// Backend client
// Forwards one browser call to the backend API, following at most one 307/308 hop

use bytes::Bytes;
use reqwest::{header, Client, Method, Response, StatusCode};
use url::Url;

use crate::error::{AppError, AppResult};
use crate::proxy::config::ProxyConfig;
use crate::proxy::middleware::AuthToken;

/// One inbound call, built once by the route handler
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Backend path, e.g. `/api/properties/`
    pub path: String,
    /// Raw query string, without `?`
    pub query: Option<String>,
    pub auth_token: Option<AuthToken>,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    /// POST/PUT/PATCH carry the original body
    pub fn is_write(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }
}

pub struct BackendClient {
    http_client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &ProxyConfig) -> AppResult<Self> {
        // Fail early on an unusable base URL
        Url::parse(&config.backend_url)?;

        let http_client = crate::utils::http::create_client_with_proxy(
            config.request_timeout,
            Some(&config.upstream_proxy),
        )?;

        Ok(Self {
            http_client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build backend URL
    fn build_url(&self, path: &str, query_string: Option<&str>) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        match query_string {
            Some(qs) if !qs.is_empty() => format!("{}{}?{}", self.base_url, path, qs),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    /// Forward the request; a 307/308 is re-issued once against its target
    pub async fn forward(&self, request: &ProxyRequest) -> AppResult<Response> {
        let url = self.build_url(&request.path, request.query.as_deref());

        tracing::info!(
            method = %request.method,
            path = %request.path,
            has_auth = request.auth_token.is_some(),
            "Forwarding request to backend"
        );

        let response = self.send(request, &url).await?;

        let status = response.status();
        if status != StatusCode::TEMPORARY_REDIRECT && status != StatusCode::PERMANENT_REDIRECT {
            return Ok(response);
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let Some(location) = location else {
            tracing::warn!("Backend returned {} without a usable Location header", status);
            return Ok(response);
        };

        let target = redirect_target(&url, &location)?;
        tracing::info!(
            status = status.as_u16(),
            target = %target,
            "Following backend redirect"
        );

        // One hop only (bounded redirect policy): a second 307/308 is returned as is
        self.send(request, target.as_str()).await
    }

    async fn send(&self, request: &ProxyRequest, url: &str) -> AppResult<Response> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = &request.auth_token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(token.header_value())
                    .map_err(|e| AppError::Unknown(format!("Invalid auth header: {}", e)))?,
            );
        }

        let mut builder = self
            .http_client
            .request(request.method.clone(), url)
            .headers(headers);

        if request.is_write() {
            if let Some(body) = &request.body {
                // Bytes clone is a refcount bump, content is untouched
                builder = builder.body(body.clone());
            }
        }

        Ok(builder.send().await?)
    }
}

/// Resolve a redirect `Location` against the URL that produced it.
/// Absolute `http://` targets are upgraded to `https://`.
pub fn redirect_target(current: &str, location: &str) -> AppResult<Url> {
    let location = location.trim();
    let rewritten = match location.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => location.to_string(),
    };
    let base = Url::parse(current)?;
    Ok(base.join(&rewritten)?)
}
