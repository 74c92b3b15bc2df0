use crate::{
    AppState,
    auth::{authenticate, require_admin},
    handlers,
};
use axum::{
    Router, middleware,
    routing::{MethodRouter, post, put},
};

/// Admin Router Module
///
/// Catalogue writes. Both gates are attached to each method router with `route_layer`,
/// so they only wrap the admin handlers themselves. Layers apply bottom-up:
/// `authenticate` resolves the bearer token first, then `require_admin` checks the role.
///
/// - No or bad token: 401, handler never runs.
/// - Valid token without the admin role: 403, handler never runs.
/// - A method no router serves (e.g. `PATCH /api/colleges/{id}`): 405, no token needed.
///   Gating the whole `Router` instead would wrap the merged 405 fallback as well.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // POST /api/colleges
        // Multipart or JSON body; the optional image is uploaded to object storage.
        .route(
            "/api/colleges",
            gated(post(handlers::create_college), &state),
        )
        // PUT/DELETE /api/colleges/{id}
        .route(
            "/api/colleges/{id}",
            gated(
                put(handlers::update_college).delete(handlers::delete_college),
                &state,
            ),
        )
}

fn gated(methods: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    methods
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}
