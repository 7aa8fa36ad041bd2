//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, body limit, request ID, metrics)
//! - Turn each request into an `Invocation` for its instrumented handler
//! - Serve until the shutdown signal fires

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, MatchedPath, Request},
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, MethodRouter},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::calculator::{CalcError, Endpoints, Latency};
use crate::config::AppConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::respond;
use crate::http::status;
use crate::observability::{metrics, Handler, Instrumentation, Invocation, Tracer};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracer: Tracer,
    pub started: Instant,
}

/// HTTP server for the calculator.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and tracer.
    pub fn new(config: AppConfig, tracer: Tracer) -> Self {
        let latency = Latency::from_config(&config.simulation);
        Self::with_latency(config, tracer, latency)
    }

    /// Like [`HttpServer::new`] with an explicit latency model.
    pub fn with_latency(config: AppConfig, tracer: Tracer, latency: Latency) -> Self {
        let instrumentation = Instrumentation::new(tracer.clone());
        let endpoints = Endpoints::new(&instrumentation, latency);

        let state = AppState {
            tracer,
            started: Instant::now(),
        };

        let router = Self::build_router(&config, endpoints, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, endpoints: Endpoints, state: AppState) -> Router {
        let Endpoints {
            add,
            subtract,
            multiply,
            divide,
            calculate,
        } = endpoints;

        Router::new()
            .route("/", get(status::index))
            .route("/health", get(status::health))
            .route("/add", operation_route(add))
            .route("/subtract", operation_route(subtract))
            .route("/multiply", operation_route(multiply))
            .route("/divide", operation_route(divide))
            .route("/calculate", operation_route(calculate))
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.limits.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(config.timeouts.request())),
            )
    }

    /// Run the server, accepting connections on the given listener.
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

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// POST route invoking `handler` with the request body.
fn operation_route<H>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<Error = CalcError> + 'static,
    H::Output: Serialize,
{
    let handler = Arc::new(handler);
    post(move |headers: HeaderMap, body: Bytes| {
        let handler = handler.clone();
        async move {
            let invocation = Invocation::from_slice(&body).with_request_id(request_id(&headers));
            respond(handler.call(invocation).await)
        }
    })
}

async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;
    metrics::record_request(&path, response.status().as_u16(), start);
    response
}
