use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Every college read here only ever returns
/// published records; the filters are pinned to `published` before they reach the
/// repository.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        .route("/api/auth/register", post(handlers::register_user))
        // POST /api/auth/login
        // Returns a bearer token in `data.token`.
        .route("/api/auth/login", post(handlers::login_user))
        // GET /api/colleges?search=...&location=...&sort=...&page=...&limit=...
        .route("/api/colleges", get(handlers::list_colleges))
        // GET /api/colleges/compare?ids=a,b,c
        // Static segment; matched ahead of the slug capture below.
        .route("/api/colleges/compare", get(handlers::compare_colleges))
        // GET /api/colleges/{slug}
        // The capture shares its name with the admin `{id}` routes so the two routers
        // merge onto one path.
        .route("/api/colleges/{id}", get(handlers::get_college_by_slug))
}
