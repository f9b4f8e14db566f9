//! Search analytics endpoints / 搜索统计接口

use axum::{
    extract::{ConnectInfo, Query, State},
    Json,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use querytrail_backend::models::QueryCount;
use querytrail_backend::search::stats;

use crate::api::ApiResponse;
use crate::state::AppState;

/// How many buckets a single user ever gets back / 单用户返回上限
const USER_STATS_LIMIT: i64 = 50;

const GLOBAL_STATS_MIN: i64 = 1;
const GLOBAL_STATS_MAX: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct UserAnalyticsQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GlobalAnalyticsQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// GET /api/search_analytics - the caller's own frequency buckets
pub async fn user_analytics(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<UserAnalyticsQuery>,
) -> Json<ApiResponse<Vec<QueryCount>>> {
    let user_key = params
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| u.to_string())
        .unwrap_or_else(|| addr.ip().to_string());

    tracing::info!("Getting search stats for {}", user_key);

    let analytics = stats::user_stats(&state.store, &user_key, USER_STATS_LIMIT).await;
    Json(ApiResponse::success(analytics))
}

/// GET /api/global_analytics - frequency buckets across all users
pub async fn global_analytics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GlobalAnalyticsQuery>,
) -> Json<ApiResponse<Vec<QueryCount>>> {
    let limit = params
        .limit
        .unwrap_or(GLOBAL_STATS_MAX)
        .clamp(GLOBAL_STATS_MIN, GLOBAL_STATS_MAX);

    let analytics = stats::global_stats(&state.store, limit).await;
    Json(ApiResponse::success(analytics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{memory_state, peer};
    use crate::state::AppState;
    use querytrail_backend::search::QueryStore;

    async fn complete(state: &Arc<AppState>, text: &str, user: &str) {
        let record = state.store.insert(text, user).await.unwrap();
        state.store.mark_completed(&record.id, text).await.unwrap();
    }

    #[tokio::test]
    async fn test_user_analytics_scopes_to_the_caller() {
        let state = memory_state().await;
        complete(&state, "ruby", "client-7").await;
        complete(&state, "ruby", "client-7").await;
        complete(&state, "rails", "someone-else").await;

        let body = user_analytics(
            State(state),
            ConnectInfo(peer()),
            Query(UserAnalyticsQuery {
                user_id: Some("client-7".to_string()),
            }),
        )
        .await
        .0;

        let counts = body.data.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].query, "ruby");
        assert_eq!(counts[0].count, 2);
    }

    #[tokio::test]
    async fn test_global_analytics_orders_and_clamps() {
        let state = memory_state().await;
        for _ in 0..3 {
            complete(&state, "x", "u1").await;
        }
        complete(&state, "y", "u2").await;

        let body = global_analytics(
            State(state.clone()),
            Query(GlobalAnalyticsQuery { limit: None }),
        )
        .await
        .0;
        let counts = body.data.unwrap();
        assert_eq!(counts[0].query, "x");
        assert_eq!(counts[0].count, 3);
        assert_eq!(counts[1].query, "y");

        // out-of-range limits are clamped, not rejected
        let body = global_analytics(State(state), Query(GlobalAnalyticsQuery { limit: Some(-5) }))
            .await
            .0;
        assert_eq!(body.data.unwrap().len(), 1);
    }
}
