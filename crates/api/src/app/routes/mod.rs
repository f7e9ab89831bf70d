use axum::Router;

pub mod jobs;
pub mod system;

/// Router for all job console endpoints.
pub fn router() -> Router {
    Router::new().nest("/jobs", jobs::router())
}
