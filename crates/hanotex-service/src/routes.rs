//! Router configuration

use crate::handlers;
use crate::state::ServiceState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the HTTP router.
///
/// The accept endpoints always answer with fixed CORS headers; the
/// supporting endpoints get a permissive `CorsLayer` when `enable_cors` is set.
pub fn build_router(state: ServiceState, enable_cors: bool) -> Router {
    let accept_routes = Router::new()
        .route(
            "/contract/accept-contract",
            post(handlers::accept::accept_contract).options(handlers::accept::preflight),
        )
        .route(
            "/technology-propose/accept-contract",
            post(handlers::accept::accept_technology_contract)
                .options(handlers::accept::preflight),
        )
        .layer(middleware::map_response(handlers::accept::cors_headers));

    let supporting_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        // Contracts
        .route("/contract", post(handlers::contracts::create_contract))
        .route("/contract/:id", get(handlers::contracts::get_contract))
        // Proposals
        .route("/proposals/:kind", post(handlers::proposals::create_proposal))
        .route(
            "/proposals/:kind/:id",
            get(handlers::proposals::get_proposal),
        );

    let supporting_routes = if enable_cors {
        supporting_routes.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        supporting_routes
    };

    accept_routes
        .merge(supporting_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
