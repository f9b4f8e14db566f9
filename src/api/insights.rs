//! Raw query insight endpoints / 查询明细接口
//!
//! Paginated listing of every tracked record plus raw-text frequency over a
//! lookback window, for the operations dashboard.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use querytrail_backend::models::{QueryCount, SearchQuery};
use querytrail_backend::search::QueryStore;

use crate::api::ApiResponse;
use crate::state::AppState;

const PER_PAGE_MIN: i64 = 10;
const PER_PAGE_MAX: i64 = 100;

const TOP_QUERIES_LIMIT_MIN: i64 = 5;
const TOP_QUERIES_LIMIT_MAX: i64 = 50;
const TOP_QUERIES_DAYS_MIN: i64 = 1;
const TOP_QUERIES_DAYS_MAX: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct InsightsQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub per_page: i64,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopQueriesQuery {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub days: i64,
}

#[derive(Debug, Serialize)]
pub struct InsightEntry {
    pub id: String,
    pub query: String,
    pub user: String,
    pub completed: bool,
    pub created: String,
}

impl From<SearchQuery> for InsightEntry {
    fn from(record: SearchQuery) -> Self {
        Self {
            id: record.id,
            query: record.query,
            user: record.user_identifier,
            completed: record.completed,
            created: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub insights: Vec<InsightEntry>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct TopQueriesResponse {
    pub period_days: i64,
    pub queries: Vec<QueryCount>,
}

/// Unparsable dates are ignored rather than rejected / 非法日期直接忽略
fn parse_day_start(date: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

fn parse_day_end(date: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|t| t.and_utc())
}

fn page_count(total: i64, per_page: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    }
}

/// GET /api/insights - recent records, newest first, with pagination meta
pub async fn list_insights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InsightsQuery>,
) -> Json<ApiResponse<InsightsResponse>> {
    let page = params.page.max(1);
    let per_page = params.per_page.clamp(PER_PAGE_MIN, PER_PAGE_MAX);
    let offset = (page - 1) * per_page;

    let start = params.start_date.as_deref().and_then(parse_day_start);
    let end = params.end_date.as_deref().and_then(parse_day_end);

    let total = match state.store.count_all(start, end).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("Failed to count insights: {}", e);
            return Json(ApiResponse::error("Couldn't load insights data"));
        }
    };

    let records = match state.store.list_recent(offset, per_page, start, end).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Failed to retrieve insights: {}", e);
            return Json(ApiResponse::error("Couldn't load insights data"));
        }
    };

    Json(ApiResponse::success(InsightsResponse {
        insights: records.into_iter().map(InsightEntry::from).collect(),
        meta: PaginationMeta {
            page,
            per_page,
            total,
            pages: page_count(total, per_page),
        },
    }))
}

/// GET /api/top_queries - raw query text frequency over the last N days
pub async fn top_queries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopQueriesQuery>,
) -> Json<ApiResponse<TopQueriesResponse>> {
    let limit = params
        .limit
        .clamp(TOP_QUERIES_LIMIT_MIN, TOP_QUERIES_LIMIT_MAX);
    let days = params.days.clamp(TOP_QUERIES_DAYS_MIN, TOP_QUERIES_DAYS_MAX);

    let since = Utc::now() - Duration::days(days);

    match state.store.top_queries_since(since, limit).await {
        Ok(queries) => Json(ApiResponse::success(TopQueriesResponse {
            period_days: days,
            queries,
        })),
        Err(e) => {
            tracing::error!("Failed to retrieve top queries: {}", e);
            Json(ApiResponse::error("Couldn't load top queries"))
        }
    }
}
