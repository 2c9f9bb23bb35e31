//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the Axum router (API routes + static frontend)
//! - Wire up middleware (tracing, timeout, body limit, request ID, CORS)
//! - Serve over plain TCP or rustls until shutdown
//! - Apply hot-reloaded auth settings

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::config::watcher::apply_reload;
use crate::config::{AdminConfig, AuthConfig};
use crate::db::MySqlPoolManager;
use crate::observability::audit::LoginLog;
use crate::observability::metrics;
use crate::security::RateLimiter;

/// How long in-flight requests get to finish once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<MySqlPoolManager>,
    pub limiter: Arc<RateLimiter>,
    /// Hot-swappable auth settings.
    pub auth: Arc<ArcSwap<AuthConfig>>,
    pub login_log: Arc<LoginLog>,
    /// Settings fixed at startup.
    pub config: Arc<AdminConfig>,
}

impl AppState {
    pub fn new(config: AdminConfig, pool: Arc<MySqlPoolManager>) -> Self {
        let login_log = Arc::new(LoginLog::new(&config.auth.login_log_path));
        Self {
            pool,
            limiter: Arc::new(RateLimiter::new()),
            auth: Arc::new(ArcSwap::from_pointee(config.auth.clone())),
            login_log,
            config: Arc::new(config),
        }
    }
}

/// HTTP server for the admin API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let server = &state.config.server;
        let static_files = ServeDir::new(Path::new(&server.static_dir)).append_index_html_on_directories(true);
        let timeout = Duration::from_secs(server.request_timeout_secs);
        let body_limit = server.max_body_size;

        // Outermost first: the request id exists before the trace span opens.
        let stack = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(timeout))
            .layer(CorsLayer::permissive())
            .layer(middleware::from_fn(track_requests));

        // Enforced by the body extractors, which answer 413.
        api::routes(state)
            .fallback_service(static_files)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(stack)
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<AdminConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_reload_task(self.state.clone(), config_updates);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<AdminConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        spawn_reload_task(self.state.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTPS server draining");
            drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn spawn_reload_task(state: AppState, mut updates: mpsc::UnboundedReceiver<AdminConfig>) {
    tokio::spawn(async move {
        while let Some(new_config) = updates.recv().await {
            apply_reload(&state.auth, &state.config, new_config);
        }
    });
}

async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16());
    response
}
