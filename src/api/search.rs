//! Partial query recording endpoint / 部分查询记录接口
//!
//! Clients stream keystrokes here. Each submission is folded into the
//! user's in-progress session; a submission the client marks final is only
//! completed when the completeness heuristic agrees (or the client forces).

use axum::{
    extract::{ConnectInfo, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use querytrail_backend::config;
use querytrail_backend::search::{completeness, finalize, tracker, QueryStore, StoreError};
use querytrail_backend::utils::truncate_chars;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordQueryRequest {
    pub query: String,
    /// Explicit user key; the peer address is used when absent / 用户标识
    #[serde(default)]
    pub user_id: Option<String>,
    /// Client believes this submission is the finished query / 客户端认为已完成
    #[serde(default)]
    pub is_final: bool,
    /// Complete regardless of what the heuristic says / 强制完成
    #[serde(default)]
    pub force_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletenessStatus {
    Empty,
    InProgress,
    Incomplete,
    Complete,
}

#[derive(Debug, Serialize)]
pub struct CompletenessInfo {
    pub appears_complete: bool,
    pub is_final: bool,
    pub client_marked_final: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordQueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub query: String,
    pub completed: bool,
    pub completeness: CompletenessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CompletenessInfo>,
}

impl RecordQueryResponse {
    fn empty() -> Self {
        Self {
            id: None,
            query: String::new(),
            completed: false,
            completeness: CompletenessStatus::Empty,
            analysis: None,
        }
    }
}

pub async fn record(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RecordQueryRequest>,
) -> Json<ApiResponse<RecordQueryResponse>> {
    let user_key = req
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| u.to_string())
        .unwrap_or_else(|| addr.ip().to_string());

    let query = req.query.trim().to_string();
    if query.is_empty() {
        tracing::info!("Skipping empty search from {}", user_key);
        return Json(ApiResponse {
            code: 200,
            message: "Query cannot be empty".to_string(),
            data: Some(RecordQueryResponse::empty()),
        });
    }

    let tracking = config::config().tracking.clone();

    // Protect the store from oversized input; truncate, never reject
    let query = if query.chars().count() > tracking.max_query_length {
        tracing::warn!(
            "Query truncated for user {}: {} chars over the {} limit",
            user_key,
            query.chars().count(),
            tracking.max_query_length
        );
        truncate_chars(&query, tracking.max_query_length)
    } else {
        query
    };

    // Forced completion skips the heuristic entirely
    let analysis = completeness::analyze(&query);
    let appears_complete = if req.force_complete {
        false
    } else {
        analysis.complete
    };

    tracing::debug!(
        "Completeness analysis for '{}': words={}, chars={}, first='{}', last='{}', rule={}, decision={}",
        query,
        analysis.word_count,
        analysis.char_length,
        analysis.first_word,
        analysis.last_word,
        analysis.matched_rule,
        if appears_complete { "COMPLETE" } else { "INCOMPLETE" }
    );

    let record = match tracker::track_query_with_window(
        &state.store,
        &query,
        &user_key,
        tracking.recency_window_minutes,
    )
    .await
    {
        Ok(Some(record)) => record,
        Ok(None) => return Json(ApiResponse::success(RecordQueryResponse::empty())),
        Err(StoreError::Validation(message)) => {
            tracing::error!("Could not save search query: {}", message);
            return Json(ApiResponse::error(&format!(
                "Failed to save search query: {}",
                message
            )));
        }
        Err(e) => {
            tracing::error!("Search error: {}", e);
            return Json(ApiResponse::error("Search processing failed"));
        }
    };

    let should_complete = req.force_complete || (req.is_final && appears_complete);

    let completeness_status = if should_complete {
        tracing::info!(
            "Recording search: '{}' ({}) - appears complete: {}",
            query,
            user_key,
            appears_complete
        );
        finalize::finish(&state.store, &record, Some(&query)).await;
        CompletenessStatus::Complete
    } else if req.is_final && !appears_complete {
        // Client claimed final but the heuristic disagreed; keep in progress
        tracing::info!("Rejected incomplete: '{}'", query);
        CompletenessStatus::Incomplete
    } else {
        CompletenessStatus::InProgress
    };

    // Read back so the response reflects what is actually stored
    let fresh = state
        .store
        .get(&record.id)
        .await
        .ok()
        .flatten()
        .unwrap_or(record);

    Json(ApiResponse::success(RecordQueryResponse {
        id: Some(fresh.id),
        query: fresh.query,
        completed: fresh.completed,
        completeness: completeness_status,
        analysis: Some(CompletenessInfo {
            appears_complete,
            is_final: should_complete,
            client_marked_final: req.is_final,
        }),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{memory_state, peer};
    use crate::state::AppState;

    fn request(query: &str, is_final: bool, force_complete: bool) -> RecordQueryRequest {
        RecordQueryRequest {
            query: query.to_string(),
            user_id: None,
            is_final,
            force_complete,
        }
    }

    async fn post(
        state: &Arc<AppState>,
        req: RecordQueryRequest,
    ) -> ApiResponse<RecordQueryResponse> {
        record(State(state.clone()), ConnectInfo(peer()), Json(req))
            .await
            .0
    }

    #[tokio::test]
    async fn test_empty_query_records_nothing() {
        let state = memory_state().await;
        let body = post(&state, request("   ", false, false)).await;

        assert_eq!(body.message, "Query cannot be empty");
        let data = body.data.unwrap();
        assert_eq!(data.completeness, CompletenessStatus::Empty);
        assert!(data.id.is_none());
        assert_eq!(state.store.count_all(None, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_partial_query_stays_in_progress() {
        let state = memory_state().await;
        let body = post(&state, request("how to use rails", false, false)).await;

        let data = body.data.unwrap();
        assert_eq!(data.completeness, CompletenessStatus::InProgress);
        assert_eq!(data.query, "how to use rails");
        assert!(!data.completed);
        assert!(data.id.is_some());
    }

    #[tokio::test]
    async fn test_continuation_reuses_the_record() {
        let state = memory_state().await;
        let first = post(&state, request("how to", false, false)).await;
        let second = post(&state, request("how to use rails", false, false)).await;

        assert_eq!(
            first.data.unwrap().id.unwrap(),
            second.data.unwrap().id.unwrap()
        );
        assert_eq!(state.store.count_all(None, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_final_complete_query_is_completed() {
        let state = memory_state().await;
        let body = post(
            &state,
            request("How to create a Rails application", true, false),
        )
        .await;

        let data = body.data.unwrap();
        assert_eq!(data.completeness, CompletenessStatus::Complete);
        assert!(data.completed);

        let analysis = data.analysis.unwrap();
        assert!(analysis.appears_complete);
        assert!(analysis.client_marked_final);
    }

    #[tokio::test]
    async fn test_final_but_incomplete_query_is_rejected() {
        let state = memory_state().await;
        let body = post(&state, request("how to use the", true, false)).await;

        let data = body.data.unwrap();
        assert_eq!(data.completeness, CompletenessStatus::Incomplete);
        assert!(!data.completed);
        assert!(!data.analysis.unwrap().appears_complete);
    }

    #[tokio::test]
    async fn test_force_complete_overrides_the_heuristic() {
        let state = memory_state().await;
        let body = post(&state, request("how to use the", true, true)).await;

        let data = body.data.unwrap();
        assert_eq!(data.completeness, CompletenessStatus::Complete);
        assert!(data.completed);
    }

    #[tokio::test]
    async fn test_explicit_user_id_overrides_peer_address() {
        let state = memory_state().await;
        let mut req = request("how to use rails", false, false);
        req.user_id = Some("client-7".to_string());
        post(&state, req).await;

        let records = state.store.list_recent(0, 10, None, None).await.unwrap();
        assert_eq!(records[0].user_identifier, "client-7");
    }

    #[tokio::test]
    async fn test_oversized_query_is_truncated_not_rejected() {
        let state = memory_state().await;
        let body = post(&state, request(&"q".repeat(500), false, false)).await;

        let data = body.data.unwrap();
        assert_eq!(data.query.chars().count(), 255);
    }
}
