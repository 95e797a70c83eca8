//! Health Check

use axum::extract::State;
use axum::Json;

use crate::models::response::HealthResponse;
use crate::state::SharedState;

pub async fn get_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let taxonomy = state.taxonomy().snapshot().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        categories: taxonomy.category_count(),
        brands: taxonomy.brand_count(),
        stored_results: state.store().len(),
    })
}
