//! Portcullis - Web API Template Service
//!
//! This crate implements a web API template with auth, billing, and admin
//! scaffolding. The route handlers are placeholders that delegate their real
//! work to external providers; the component with actual engineering content
//! is the sliding-window rate limiter middleware that gates every inbound
//! request against a shared counter store.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
