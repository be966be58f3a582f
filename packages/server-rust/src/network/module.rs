//! Network module with deferred startup.
//!
//! `new()` prepares shared state, `start()` binds the listener and
//! `serve()` accepts connections until shutdown, then drains in-flight
//! dispatches.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{health_handler, root_handler, service_routes, AppState};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::service::Dispatcher;

/// Upper bound on waiting for in-flight dispatches after shutdown.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the HTTP listener and its lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    dispatcher: Arc<Dispatcher>,
    shutdown: Arc<ShutdownController>,
    start_time: Instant,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            listener: None,
            dispatcher,
            shutdown: Arc::new(ShutdownController::new()),
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the router:
    ///
    /// - `GET /` liveness probe, body `ok`
    /// - `GET /health` health JSON
    /// - `GET /<hook>` and `POST /<hook>/{event}` for every registered service
    pub fn build_router(&self) -> Router {
        let state = AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
        };

        let mut router = Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler));
        for service in self.dispatcher.registry().iter() {
            router = router.merge(service_routes(Arc::clone(service)));
        }

        router
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener and returns the bound port, which differs
    /// from the configured one when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves or the shutdown controller is
    /// triggered, then waits up to [`DRAIN_TIMEOUT`] for in-flight
    /// dispatches.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, TLS material cannot be
    /// loaded, or the server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        self.shutdown.set_ready();
        info!(services = self.dispatcher.registry().len(), "accepting webhooks");

        let signal = {
            let controller = Arc::clone(&self.shutdown);
            tokio::spawn(async move {
                shutdown.await;
                controller.trigger_shutdown();
            })
        };
        let stopping = {
            let controller = Arc::clone(&self.shutdown);
            async move { controller.wait_for_shutdown().await }
        };

        let served = match &self.config.tls {
            Some(tls) => serve_tls(listener, router, tls, stopping).await,
            None => serve_plain(listener, router, stopping).await,
        };
        signal.abort();
        served?;

        drain(&self.shutdown).await;
        Ok(())
    }
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Serves TLS with `axum-server`, reusing the already bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!(%addr, "serving TLS");

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

async fn drain(shutdown: &ShutdownController) {
    let pending = shutdown.in_flight_count();
    if pending > 0 {
        info!(pending, "waiting for in-flight dispatches");
    }
    if shutdown.wait_for_drain(DRAIN_TIMEOUT).await {
        info!("all dispatches drained");
    } else {
        warn!(
            remaining = shutdown.in_flight_count(),
            "drain timeout expired with dispatches in flight"
        );
    }
}
