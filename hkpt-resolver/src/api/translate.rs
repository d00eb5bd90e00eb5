//! Translation endpoints
//!
//! POST /translate, POST /translate-text

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    types::{Context, TranslationResult},
    AppState,
};

/// POST /translate request
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub name: String,
    #[serde(default)]
    pub context: Option<Context>,
}

/// POST /translate-text request
#[derive(Debug, Deserialize)]
pub struct TranslateTextRequest {
    pub text: String,
}

/// POST /translate-text response
#[derive(Debug, Serialize)]
pub struct TranslateTextResponse {
    pub translated: String,
}

/// POST /translate
///
/// Resolve one property name. Always 200 for a well-formed request; the
/// waterfall never fails.
pub async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> ApiResult<Json<TranslationResult>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be blank".to_string()));
    }

    let result = state
        .translator
        .resolve(name, request.context.as_ref())
        .await;

    Ok(Json(result))
}

/// POST /translate-text
///
/// Free-text translation that keeps `@@TOKEN@@` placeholders intact.
pub async fn translate_text(
    State(state): State<AppState>,
    payload: Result<Json<TranslateTextRequest>, JsonRejection>,
) -> ApiResult<Json<TranslateTextResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be blank".to_string()));
    }

    let translated = state
        .translator
        .translate_text(&request.text)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Text translation failed");
            ApiError::BadGateway(e.to_string())
        })?;

    Ok(Json(TranslateTextResponse { translated }))
}

/// Build translation routes
pub fn translate_routes() -> Router<AppState> {
    Router::new()
        .route("/translate", post(translate))
        .route("/translate-text", post(translate_text))
}
