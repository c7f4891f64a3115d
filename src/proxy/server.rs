use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::proxy::config::{CookieConfig, RelayConfig};
use crate::proxy::static_files::{self, StaticFiles};
use crate::proxy::upstream::UpstreamClient;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Axum application state
///
/// Holds no session data: every request carries its own session in cookies.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub cookies: CookieConfig,
    pub static_files: Arc<StaticFiles>,
}

impl AppState {
    pub fn new(config: &RelayConfig) -> AppResult<Self> {
        let upstream = UpstreamClient::new(
            &config.backend,
            config.request_timeout,
            Some(config.upstream_proxy.clone()),
        )?;

        Ok(Self {
            upstream: Arc::new(upstream),
            cookies: config.cookies.clone(),
            static_files: Arc::new(StaticFiles::new(
                config.static_dir.clone(),
                &config.fallback_document,
            )),
        })
    }
}

/// Build the full application router
pub fn build_router(config: &RelayConfig) -> AppResult<Router> {
    use crate::proxy::handlers::{auth, calculator};

    let state = AppState::new(config)?;

    let api = Router::new()
        .route("/register", post(auth::handle_register))
        .route("/login", post(auth::handle_login))
        .route("/authorize", get(auth::handle_authorize))
        .route("/calculate", post(calculator::handle_calculate))
        .route("/expressions", get(calculator::handle_list_expressions))
        .route("/expressions/:id", get(calculator::handle_get_expression));

    let prefix = config.normalized_api_prefix();
    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    Ok(router
        .route("/healthz", get(health_check_handler))
        .fallback(static_files::serve)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            crate::proxy::middleware::logging_middleware,
        ))
        .layer(crate::proxy::middleware::cors_layer())
        .with_state(state))
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(config: &RelayConfig) -> AppResult<(Self, tokio::task::JoinHandle<()>)> {
        let app = build_router(config)?;

        // Bind address
        let addr = format!("{}:{}", config.get_bind_address(), config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| AppError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            "Relay server started at http://{} (api prefix {:?})",
            local_addr,
            config.normalized_api_prefix()
        );

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

                                // Dropping the connection drops the in-flight relay
                                // future before any cookie is written
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
                        tracing::info!("Relay server stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
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
