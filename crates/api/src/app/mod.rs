//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the shared `PartService`
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::SharedService;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: SharedService) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
