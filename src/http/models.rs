//! Request and response models for the API surface.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Generic single-message response used by scaffolding endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Signup request payload.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Login request payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile update payload.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: String,
}

/// Subscription creation payload.
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub price_id: String,
}

/// Body of the fixed rate-limit rejection response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitExceeded {
    pub error: String,
    pub detail: String,
    pub retry_after: u64,
}
