//! HTTP surface: health/readiness probes, position status, and the signal
//! webhook.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
