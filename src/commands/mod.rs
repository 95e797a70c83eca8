//! HTTP Commands
//!
//! Request handlers of the map API and the router that mounts them, with
//! the legacy `/v1/...` paths kept as aliases.

pub mod health;
pub mod map;
pub mod query;
pub mod review;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub use health::get_health;
pub use map::map_geojson;
pub use query::{map_query, trip_plan};
pub use review::review_continue;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/query", post(map_query))
        .route("/trip", post(trip_plan))
        .route("/review", post(review_continue))
        .route("/map/:store_id/geojson", get(map_geojson))
        .route("/health", get(get_health))
        .route("/v1/map/query", post(map_query))
        .route("/v1/trip/plan", post(trip_plan))
        .route("/v1/review/continue", post(review_continue))
        .route("/v1/map/:store_id/geojson", get(map_geojson))
        .layer(middleware::from_fn_with_state(state.clone(), taxonomy_hot_reload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Pick up taxonomy edits before handling the request.
async fn taxonomy_hot_reload(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    state.taxonomy().reload_if_changed().await;
    next.run(request).await
}
