use axum::Router;

pub mod parts;
pub mod system;

/// Router for all `/api` endpoints.
pub fn router() -> Router {
    Router::new().merge(parts::router())
}
