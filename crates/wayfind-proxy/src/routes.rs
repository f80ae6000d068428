//! Router setup with all proxy routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use wayfind_core::WayfindError;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
///
/// `/api/*` is rate limited; `/health` is not.
pub fn create_router(state: AppState) -> Router {
    // Any origin: the browser front end may be served from anywhere.
    let cors = CorsLayer::permissive();

    let limiter = RateLimiter::new(
        state.config.rate_limit_max,
        state.config.rate_limit_window_secs,
    );

    let api_routes = Router::new()
        .route("/api/maps-config", get(handlers::maps_config))
        .route("/api/places/search", post(handlers::search_places))
        .route("/api/geocode", post(handlers::geocode))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(limiter));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind the configured port and serve until the process exits.
pub async fn start_server(state: AppState) -> Result<(), WayfindError> {
    let addr = format!("127.0.0.1:{}", state.config.port);
    let router = create_router(state);

    tracing::info!("Starting places proxy on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WayfindError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| WayfindError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
