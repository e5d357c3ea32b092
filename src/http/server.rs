//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Compose the admission gates in their fixed order
//! - Wire up infrastructure layers (request ID, tracing, timeout, body limit)
//! - Bind server to listener and shut down gracefully
//! - Sweep idle rate limit buckets in the background

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::middleware::logging::request_logging_middleware;
use crate::http::request::UuidRequestId;
use crate::lifecycle::signals::shutdown_signal;
use crate::scripts::{ProcessDispatcher, ScriptRegistry};
use crate::security::access_control::{ip_allow_list_middleware, CidrAllowList};
use crate::security::auth::{api_key_middleware, KeyAuthenticator};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ScriptRegistry>,
    pub dispatcher: Arc<ProcessDispatcher>,
}

/// State of the admission gates. Each gate only sees its own part.
#[derive(Clone)]
pub struct Gates {
    /// `None` when rate limiting is disabled.
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub allow_list: Arc<CidrAllowList>,
    pub authenticator: Arc<KeyAuthenticator>,
}

impl Gates {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            rate_limiter: config
                .rate_limit
                .enabled
                .then(|| Arc::new(RateLimiter::new(&config.rate_limit))),
            allow_list: Arc::new(CidrAllowList::from_entries(&config.access.allowed_ips)),
            authenticator: Arc::new(KeyAuthenticator::from_config(&config.auth)),
        }
    }
}

/// HTTP server for the script gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    gates: Gates,
}

impl GatewayServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let registry = Arc::new(ScriptRegistry::new(&config.scripts));
        let dispatcher = Arc::new(ProcessDispatcher::new(
            registry.clone(),
            Duration::from_secs(config.scripts.run_timeout_secs),
        ));
        let state = AppState {
            registry,
            dispatcher,
        };
        let gates = Gates::from_config(&config);

        tracing::info!(
            allowed_entries = gates.allow_list.len(),
            rate_limiting = gates.rate_limiter.is_some(),
            api_keys = config.auth.api_keys.len(),
            scripts_dir = %state.registry.directory().display(),
            "Gateway initialized"
        );

        let router = Self::build_router(&config, state, &gates);
        Self {
            router,
            config,
            gates,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers wrap from the bottom up, so the request passes through them in
    /// reverse order of `.layer` calls: request ID, trace, logging, timeout,
    /// rate limit, IP allow-list, API key, body limit, handler.
    pub fn build_router(config: &GatewayConfig, state: AppState, gates: &Gates) -> Router {
        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/", get(handlers::root))
            .route("/run-script", post(handlers::run_script))
            .route("/list-scripts", get(handlers::list_scripts))
            .route("/script-info/{name}", get(handlers::script_info))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(from_fn_with_state(
                gates.authenticator.clone(),
                api_key_middleware,
            ))
            .layer(from_fn_with_state(
                gates.allow_list.clone(),
                ip_allow_list_middleware,
            ));

        if let Some(limiter) = &gates.rate_limiter {
            router = router.layer(from_fn_with_state(limiter.clone(), rate_limit_middleware));
        }

        router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(from_fn(request_logging_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The assembled router, for driving the gateway without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires or the process is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        if let Some(limiter) = &self.gates.rate_limiter {
            let interval = self.config.rate_limit.eviction_interval_secs;
            if interval > 0 {
                tokio::spawn(
                    limiter
                        .clone()
                        .run_eviction(Duration::from_secs(interval), shutdown.resubscribe()),
                );
            }
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        // Serve with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => tracing::info!("Shutdown requested"),
                    _ = shutdown_signal() => {}
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
