//! Versioned API route surface.
//!
//! Nearly all handlers here are scaffolding: they return placeholder
//! payloads and leave the real work (identity verification, billing) to
//! external providers. The rate limiter middleware attached in
//! `HttpServer` is what actually gates these routes.

use axum::{
    extract::Path,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::models::{
    CreateSubscriptionRequest, HealthResponse, LoginRequest, MessageResponse, ProfileUpdate,
    SignupRequest,
};

/// Build the full API router, nested under `/api/v1`.
pub fn api_router() -> Router {
    Router::new().nest("/api/v1", v1_router())
}

fn v1_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_router())
        .nest("/payments", payments_router())
        .nest("/protected", protected_router())
        .nest("/admin", admin_router())
}

fn auth_router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/profile", get(get_profile).put(update_profile))
}

fn payments_router() -> Router {
    Router::new()
        .route("/create-subscription", post(create_subscription))
        .route("/cancel-subscription", post(cancel_subscription))
        .route("/subscription-status", get(subscription_status))
        .route("/webhook", post(billing_webhook))
}

fn protected_router() -> Router {
    Router::new()
        .route("/free-feature", get(free_feature))
        .route("/premium-feature", get(premium_feature))
        .route("/usage-tracked-feature", post(usage_tracked_feature))
}

fn admin_router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/subscriptions", get(subscription_overview))
        .route("/users/{user_id}/subscription", post(modify_user_subscription))
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Service is running".to_string(),
    })
}

async fn signup(Json(_): Json<SignupRequest>) -> Json<Value> {
    Json(json!({
        "message": "Signup endpoint - integrate with your identity provider",
        "note": "User signup is handled by the external identity provider"
    }))
}

async fn login(Json(_): Json<LoginRequest>) -> Json<Value> {
    Json(json!({
        "message": "Login endpoint - integrate with your identity provider",
        "note": "User login is handled by the external identity provider"
    }))
}

async fn get_profile() -> Json<Value> {
    Json(json!({
        "message": "Profile endpoint - token verification is delegated to the identity provider",
        "subscription_status": "free"
    }))
}

async fn update_profile(Json(_): Json<ProfileUpdate>) -> Json<MessageResponse> {
    Json(MessageResponse::new(
        "Profile update endpoint - implement based on your needs",
    ))
}

async fn create_subscription(Json(request): Json<CreateSubscriptionRequest>) -> Json<Value> {
    Json(json!({
        "message": "Subscription creation endpoint - integrate with your billing provider",
        "price_id": request.price_id
    }))
}

async fn cancel_subscription() -> Json<MessageResponse> {
    Json(MessageResponse::new("Subscription cancellation endpoint"))
}

async fn subscription_status() -> Json<Value> {
    Json(json!({
        "status": "free",
        "is_premium": false
    }))
}

async fn billing_webhook() -> Json<Value> {
    Json(json!({ "status": "webhook received" }))
}

async fn free_feature() -> Json<Value> {
    Json(json!({
        "message": "Hello!",
        "feature": "This is a free feature available to all users"
    }))
}

async fn premium_feature() -> Json<Value> {
    Json(json!({
        "message": "Welcome, premium user!",
        "feature": "This is an exclusive premium feature"
    }))
}

async fn usage_tracked_feature(Json(data): Json<Value>) -> Json<Value> {
    Json(json!({
        "result": {
            "processed": true,
            "input_data": data
        },
        "usage": {
            "feature": "usage_tracked_feature",
            "units_consumed": 1,
            "note": "Usage tracking is handled by the external billing provider"
        }
    }))
}

async fn list_users() -> Json<Value> {
    Json(json!({
        "message": "Admin endpoint - list all users",
        "note": "Implement user listing against your identity provider"
    }))
}

async fn subscription_overview() -> Json<Value> {
    Json(json!({
        "message": "Admin endpoint - subscription analytics",
        "note": "Implement subscription metrics and analytics"
    }))
}

async fn modify_user_subscription(Path(user_id): Path<String>) -> Json<Value> {
    Json(json!({
        "message": format!("Admin endpoint - modify subscription for user {}", user_id),
        "note": "Implement subscription management for customer support"
    }))
}
