use axum::{routing::get, Router};

pub mod auth;
pub mod organizations;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/api/auth/me", get(auth::me))
        .nest("/api/organizations", organizations::router())
}
