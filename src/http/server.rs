//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every path goes to the dispatcher
//! - Wire up middleware (request ID, tracing, body limit)
//! - Convert between Axum and dispatcher requests/responses
//! - Run the synchronous dispatcher off the async workers
//! - Serve until shutdown, draining in-flight requests
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → SetRequestId → Trace → PropagateRequestId → BodyLimit
//!     → dispatch_handler: axum Request → http::request::Request
//!     → spawn_blocking(Application::call)
//!     → http::response::Response → axum Response (+ metrics)
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request as HttpRequest, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::dispatch::Application;
use crate::http::request::{Request, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// HTTP front end for an [`Application`].
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(app: Arc<Application>, config: &ListenerConfig) -> Self {
        Self {
            router: Self::build_router(app, config),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(app: Arc<Application>, config: &ListenerConfig) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .fallback(dispatch_handler)
            .with_state(app)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &HttpRequest<Body>| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "http",
                            request_id = %request_id,
                            method = %request.method(),
                            uri = %request.uri(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(RequestBodyLimitLayer::new(config.max_body_size)),
            )
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Hand every request to the dispatcher.
async fn dispatch_handler(
    State(app): State<Arc<Application>>,
    request: HttpRequest<Body>,
) -> HttpResponse {
    let start = Instant::now();
    let method = request.method().to_string();

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            metrics::record_request(&method, 413, start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut request = Request::new(parts.method.clone(), target);
    request.headers = parts.headers;
    request.body = body;

    let response = match tokio::task::spawn_blocking(move || app.call(request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Dispatcher task failed");
            metrics::record_request(&method, 500, start);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    metrics::record_request(&method, response.status.as_u16(), start);
    response.into_http()
}
