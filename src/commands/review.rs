//! Human review of an escalated result.

use axum::extract::State;
use axum::Json;

use crate::models::response::{AgentResponse, ReviewRequest};
use crate::state::SharedState;
use crate::utils::error::AppResult;

pub async fn review_continue(
    State(state): State<SharedState>,
    Json(payload): Json<ReviewRequest>,
) -> AppResult<Json<AgentResponse>> {
    let (review_text, context) = payload.into_context()?;
    tracing::info!("[http] review ({}): {}", context.mode, review_text);
    let taxonomy = state.taxonomy().snapshot().await;
    let response = state
        .control()
        .handle_review(&taxonomy, &review_text, context)
        .await?;
    Ok(Json(response))
}
