//! HTTP server lifecycle.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tracing::{error, info};

use crate::error::Result;
use crate::ratelimit::RateLimiter;

use super::middleware::rate_limit;
use super::routes::api_router;

/// HTTP server for the API surface.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter gating every route
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, limiter: Arc<RateLimiter>) -> Self {
        Self { addr, limiter }
    }

    /// Build the router with the rate limiter wrapped around every route.
    fn router(&self) -> Router {
        api_router().layer(middleware::from_fn_with_state(
            self.limiter.clone(),
            rate_limit,
        ))
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server shuts down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        info!(addr = %self.addr, "Starting HTTP server");

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::HEADER_LIMIT;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_gates_routes_with_limiter() {
        let limiter = Arc::new(RateLimiter::disabled(60, Duration::from_secs(60)));
        let server = HttpServer::new("127.0.0.1:0".parse().unwrap(), limiter);

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[HEADER_LIMIT], "60");
    }
}
