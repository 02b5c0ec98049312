//! HTTP server, routes, and middleware.

mod middleware;
pub mod models;
mod routes;
mod server;

pub use middleware::rate_limit;
pub use routes::api_router;
pub use server::HttpServer;
