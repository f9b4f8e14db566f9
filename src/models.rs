use serde::{Deserialize, Serialize};

/// A single tracked search query. One row per session; partial keystrokes
/// from the same user fold into the same row until it completes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchQuery {
    pub id: String,
    pub query: String,
    pub final_query: Option<String>,
    pub user_identifier: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// One aggregation bucket: a canonical query and how often it was searched.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryCount {
    pub query: String,
    pub count: i64,
}
