//! Translation statistics endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::{error::ApiResult, types::TranslationStats, AppState};

/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<TranslationStats>> {
    let stats = state.translator.stats().await?;
    Ok(Json(stats))
}

/// Build statistics routes
pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}
