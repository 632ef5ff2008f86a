use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::proxy::config::ProxyConfig;
use crate::proxy::upstream::BackendClient;

/// Axum application state, read-only and shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub upstream: Arc<BackendClient>,
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

/// Build the gateway router
pub fn build_router(state: AppState) -> Router {
    use crate::proxy::handlers;
    use handlers::handle_method_not_allowed as not_allowed;

    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        // Auth
        .route(
            "/api/auth/login",
            post(handlers::auth::handle_login).fallback(not_allowed),
        )
        .route(
            "/api/auth/register",
            post(handlers::auth::handle_register).fallback(not_allowed),
        )
        .route(
            "/api/auth/me",
            get(handlers::auth::handle_me).fallback(not_allowed),
        )
        .route(
            "/api/auth/logout",
            post(handlers::auth::handle_logout).fallback(not_allowed),
        )
        .route("/healthz", get(health_check_handler).fallback(not_allowed))
        // Resources, any method: `/api/<resource>[/...]`
        .fallback(handlers::resources::handle_resource)
        .layer(
            ServiceBuilder::new()
                .layer(crate::proxy::middleware::cors_layer())
                .layer(axum::middleware::from_fn(
                    crate::proxy::middleware::auth_middleware,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(state)
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(
        config: ProxyConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let upstream = BackendClient::new(&config)
            .map_err(|e| format!("Failed to create backend client: {}", e))?;

        // Bind address
        let addr = format!("{}:{}", config.get_bind_address(), config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind address {}: {}", addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        tracing::info!(
            "Gateway started at http://{}, backend {}",
            local_addr,
            config.backend_url
        );

        let state = AppState {
            config: Arc::new(config),
            upstream: Arc::new(upstream),
        };
        let app = build_router(state);

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
            local_addr,
        };

        // Start server in new task
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Gateway stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok"
    }))
    .into_response()
}
