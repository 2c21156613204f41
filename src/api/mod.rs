//! HTTP surface — a thin axum adapter over the core pipeline.

pub mod envelope;
pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_app;
