//! Free-text map search and trip planning.

use axum::extract::State;
use axum::Json;
use tokyo_map_tools::Mode;

use crate::models::response::{AgentResponse, QueryRequest};
use crate::state::SharedState;
use crate::utils::error::AppResult;

pub async fn map_query(
    State(state): State<SharedState>,
    Json(payload): Json<QueryRequest>,
) -> AppResult<Json<AgentResponse>> {
    run(&state, &payload.text, Mode::Search).await
}

pub async fn trip_plan(
    State(state): State<SharedState>,
    Json(payload): Json<QueryRequest>,
) -> AppResult<Json<AgentResponse>> {
    run(&state, &payload.text, Mode::Trip).await
}

async fn run(state: &SharedState, text: &str, mode: Mode) -> AppResult<Json<AgentResponse>> {
    tracing::info!("[http] {} request: {}", mode, text);
    let taxonomy = state.taxonomy().snapshot().await;
    let response = state.control().handle_request(&taxonomy, text, mode).await?;
    Ok(Json(response))
}
