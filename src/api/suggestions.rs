//! Search suggestion endpoints / 搜索建议接口

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use querytrail_backend::search::QueryStore;

use crate::api::ApiResponse;
use crate::state::AppState;

const SUGGESTIONS_LIMIT: i64 = 10;

const POPULAR_MIN: i64 = 5;
const POPULAR_MAX: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default)]
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub query: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PopularResponse {
    pub suggestions: Vec<String>,
}

/// GET /api/suggestions - completed queries containing the typed term
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionsQuery>,
) -> Json<ApiResponse<SuggestionsResponse>> {
    let term = params.query.trim().to_string();

    if term.is_empty() {
        return Json(ApiResponse::success(SuggestionsResponse {
            query: term,
            suggestions: Vec::new(),
        }));
    }

    match state.store.suggestions(&term, SUGGESTIONS_LIMIT).await {
        Ok(suggestions) => Json(ApiResponse::success(SuggestionsResponse {
            query: term,
            suggestions,
        })),
        Err(e) => {
            tracing::error!("Suggestions error: {}", e);
            Json(ApiResponse::error("Failed to load suggestions"))
        }
    }
}

/// GET /api/popular_searches - most frequent completed queries
pub async fn popular_searches(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopularQuery>,
) -> Json<ApiResponse<PopularResponse>> {
    // Requests outside the allowed range are clamped, not rejected
    let limit = params.limit.clamp(POPULAR_MIN, POPULAR_MAX);

    match state.store.popular(limit).await {
        Ok(suggestions) => Json(ApiResponse::success(PopularResponse { suggestions })),
        Err(e) => {
            tracing::error!("Popular searches error: {}", e);
            Json(ApiResponse::error("Failed to load popular searches"))
        }
    }
}
