//! Rate limiting middleware.
//!
//! Wraps every API route: derives the caller identity, consults the
//! limiter, and either forwards the request (annotating the response with
//! quota headers) or short-circuits with a 429.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use super::models::RateLimitExceeded;
use crate::ratelimit::{CallerIdentity, Decision, Quota, RateLimiter};

/// Configured ceiling for the window.
pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
/// Remaining budget in the current window.
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
/// Epoch seconds at which the window resets.
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Admission control middleware.
///
/// Every admitted request carries quota headers on its response, whether the
/// limiter is active or disabled. Rejections never reach the handler chain.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let identity = CallerIdentity::derive(request.headers(), peer);
    let now = chrono::Utc::now().timestamp().max(0) as u64;

    match limiter.evaluate(&identity, now).await {
        Decision::Admitted(quota) => {
            let mut response = next.run(request).await;
            apply_quota_headers(response.headers_mut(), quota);
            response
        }
        Decision::Rejected { limit, retry_after } => {
            debug!(identity = %identity, "Rejecting rate limited request");
            rejection_response(limit, retry_after)
        }
    }
}

fn apply_quota_headers(headers: &mut HeaderMap, quota: Quota) {
    headers.insert(HEADER_LIMIT, HeaderValue::from(quota.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(quota.remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(quota.reset_at));
}

fn rejection_response(limit: u32, retry_after: u64) -> Response {
    let body = RateLimitExceeded {
        error: "Rate limit exceeded".to_string(),
        detail: format!("Maximum {} requests per minute allowed", limit),
        retry_after,
    };

    (
        StatusCode::TOO_MANY_REQUESTS,
        [(RETRY_AFTER, HeaderValue::from(retry_after))],
        Json(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::MemoryCounterStore;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app(limiter: RateLimiter) -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn_with_state(
                Arc::new(limiter),
                rate_limit,
            ))
    }

    fn request_from(ip: &str) -> Request<Body> {
        Request::builder()
            .uri("/ping")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    fn active_limiter(max: u32) -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryCounterStore::new()),
            max,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_admitted_response_carries_quota_headers() {
        let app = test_app(active_limiter(2));

        let response = app.oneshot(request_from("203.0.113.9")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[HEADER_LIMIT], "2");
        assert_eq!(response.headers()[HEADER_REMAINING], "1");
        assert!(response.headers().contains_key(HEADER_RESET));
    }

    #[tokio::test]
    async fn test_rejection_has_fixed_body_and_retry_after() {
        let app = test_app(active_limiter(2));

        app.clone().oneshot(request_from("203.0.113.9")).await.unwrap();
        app.clone().oneshot(request_from("203.0.113.9")).await.unwrap();
        let response = app.oneshot(request_from("203.0.113.9")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "60");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: RateLimitExceeded = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Rate limit exceeded");
        assert_eq!(body.detail, "Maximum 2 requests per minute allowed");
        assert_eq!(body.retry_after, 60);
    }

    #[tokio::test]
    async fn test_callers_are_limited_independently() {
        let app = test_app(active_limiter(1));

        app.clone().oneshot(request_from("203.0.113.9")).await.unwrap();
        let rejected = app.clone().oneshot(request_from("203.0.113.9")).await.unwrap();
        let other = app.oneshot(request_from("198.51.100.1")).await.unwrap();

        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_disabled_limiter_admits_with_headers() {
        let app = test_app(RateLimiter::disabled(2, Duration::from_secs(60)));

        for _ in 0..10 {
            let response = app.clone().oneshot(request_from("203.0.113.9")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[HEADER_REMAINING], "2");
        }
    }
}
