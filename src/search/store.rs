//! Query record store / 查询记录存储
//!
//! The only shared mutable resource in the system. Everything the tracking
//! core needs from persistence goes through the [`QueryStore`] trait so the
//! matching and consolidation logic stays testable against doubles;
//! [`SqliteQueryStore`] is the production implementation.
//!
//! Prefix matching is done with LIKE against lower-cased columns; the
//! per-user recency scan is backed by an index on
//! (user_identifier, completed, created_at).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{QueryCount, SearchQuery};
use crate::utils::{escape_like, truncate_chars};

use super::MAX_QUERY_LENGTH;

/// Store failure taxonomy. Validation problems carry a message the caller
/// can surface; anything else is a generic persistence error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence gateway for query records / 查询记录持久化网关
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Most recent in-progress record for the user, created at or after
    /// `since`, whose text equals the new text case-insensitively or is a
    /// case-insensitive prefix of it in either direction.
    async fn find_recent_in_progress(
        &self,
        user_key: &str,
        text: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<SearchQuery>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<SearchQuery>, StoreError>;

    /// Insert a fresh in-progress record. The store assigns id and
    /// timestamps; over-length text is truncated, not rejected.
    async fn insert(&self, text: &str, user_key: &str) -> Result<SearchQuery, StoreError>;

    async fn update_text(&self, id: &str, text: &str) -> Result<(), StoreError>;

    /// Flip a record to completed with its canonical final text.
    async fn mark_completed(&self, id: &str, final_text: &str) -> Result<(), StoreError>;

    /// Delete the user's in-progress records that are prefix-related to the
    /// final text (either direction, case-insensitive). `keep_id` shields
    /// the record currently being finalized, which is still in progress at
    /// cleanup time and always prefix-related to its own final text.
    /// Returns the count.
    async fn delete_incomplete_related(
        &self,
        user_key: &str,
        final_text: &str,
        keep_id: Option<&str>,
    ) -> Result<u64, StoreError>;

    /// Rewrite final_query on the user's completed records whose final text
    /// differs from but is prefix-related to the new one. Returns the count.
    async fn merge_similar_completed(
        &self,
        user_key: &str,
        final_text: &str,
    ) -> Result<u64, StoreError>;

    /// Completed records grouped by final_query, most frequent first. Tie
    /// order between equal counts is whatever SQLite returns.
    async fn grouped_counts(
        &self,
        user_key: Option<&str>,
        limit: i64,
    ) -> Result<Vec<QueryCount>, StoreError>;

    /// Distinct completed final_query values containing `term`
    /// (case-insensitive substring), most frequent first.
    async fn suggestions(&self, term: &str, limit: i64) -> Result<Vec<String>, StoreError>;

    /// Distinct completed final_query values, most frequent first.
    async fn popular(&self, limit: i64) -> Result<Vec<String>, StoreError>;

    /// Records in any state, newest first, optionally bounded by creation
    /// time on either side.
    async fn list_recent(
        &self,
        offset: i64,
        limit: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SearchQuery>, StoreError>;

    async fn count_all(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<i64, StoreError>;

    /// Raw query text frequency over a lookback window (all states).
    async fn top_queries_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QueryCount>, StoreError>;
}

const SELECT_COLUMNS: &str =
    "id, query, final_query, user_identifier, completed, created_at, updated_at";

/// SQLite-backed query store / SQLite 查询存储
#[derive(Clone)]
pub struct SqliteQueryStore {
    db: SqlitePool,
}

impl SqliteQueryStore {
    /// Use an existing connection pool / 使用现有连接池
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize table structure. Only creates what is missing, never
    /// drops existing data / 初始化表结构，不删除已有数据
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_queries (
                id TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                final_query TEXT,
                user_identifier TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        // Backs the per-user recency scan in find_recent_in_progress
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_search_queries_user_state
            ON search_queries (user_identifier, completed, created_at)
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl QueryStore for SqliteQueryStore {
    async fn find_recent_in_progress(
        &self,
        user_key: &str,
        text: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<SearchQuery>, StoreError> {
        let record = sqlx::query_as::<_, SearchQuery>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM search_queries
            WHERE user_identifier = ? AND completed = 0 AND created_at >= ?
              AND (LOWER(query) = LOWER(?)
                   OR LOWER(?) LIKE LOWER(query) || '%'
                   OR LOWER(query) LIKE LOWER(?) || '%')
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_key)
        .bind(since.to_rfc3339())
        .bind(text)
        .bind(text)
        .bind(text)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<SearchQuery>, StoreError> {
        let record = sqlx::query_as::<_, SearchQuery>(&format!(
            "SELECT {SELECT_COLUMNS} FROM search_queries WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    async fn insert(&self, text: &str, user_key: &str) -> Result<SearchQuery, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Validation("query cannot be blank".to_string()));
        }
        if user_key.trim().is_empty() {
            return Err(StoreError::Validation(
                "user identifier cannot be blank".to_string(),
            ));
        }

        let record = SearchQuery {
            id: Uuid::new_v4().to_string(),
            query: truncate_chars(text, MAX_QUERY_LENGTH),
            final_query: None,
            user_identifier: user_key.trim().to_string(),
            completed: false,
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        };

        sqlx::query(
            r#"
            INSERT INTO search_queries (id, query, final_query, user_identifier, completed, created_at, updated_at)
            VALUES (?, ?, NULL, ?, 0, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.query)
        .bind(&record.user_identifier)
        .bind(&record.created_at)
        .bind(&record.updated_at)
        .execute(&self.db)
        .await?;

        Ok(record)
    }

    async fn update_text(&self, id: &str, text: &str) -> Result<(), StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Validation("query cannot be blank".to_string()));
        }

        let result = sqlx::query(
            "UPDATE search_queries SET query = ?, updated_at = ? WHERE id = ?",
        )
        .bind(truncate_chars(text, MAX_QUERY_LENGTH))
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Validation(format!("record {} not found", id)));
        }
        Ok(())
    }

    async fn mark_completed(&self, id: &str, final_text: &str) -> Result<(), StoreError> {
        let final_text = final_text.trim();
        // A completed record must always carry a final query
        if final_text.is_empty() {
            return Err(StoreError::Validation(
                "final query cannot be blank".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE search_queries SET completed = 1, final_query = ?, updated_at = ? WHERE id = ?",
        )
        .bind(truncate_chars(final_text, MAX_QUERY_LENGTH))
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Validation(format!("record {} not found", id)));
        }
        Ok(())
    }

    async fn delete_incomplete_related(
        &self,
        user_key: &str,
        final_text: &str,
        keep_id: Option<&str>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM search_queries
            WHERE user_identifier = ? AND completed = 0
              AND id != COALESCE(?, '')
              AND (LOWER(?) LIKE LOWER(query) || '%'
                   OR LOWER(query) LIKE LOWER(?) || '%')
            "#,
        )
        .bind(user_key)
        .bind(keep_id)
        .bind(final_text)
        .bind(final_text)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn merge_similar_completed(
        &self,
        user_key: &str,
        final_text: &str,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE search_queries
            SET final_query = ?, updated_at = ?
            WHERE user_identifier = ? AND completed = 1
              AND final_query IS NOT NULL AND final_query != ?
              AND (LOWER(final_query) LIKE LOWER(?) || '%'
                   OR LOWER(?) LIKE LOWER(final_query) || '%')
            "#,
        )
        .bind(final_text)
        .bind(Utc::now().to_rfc3339())
        .bind(user_key)
        .bind(final_text)
        .bind(final_text)
        .bind(final_text)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn grouped_counts(
        &self,
        user_key: Option<&str>,
        limit: i64,
    ) -> Result<Vec<QueryCount>, StoreError> {
        let rows = match user_key {
            Some(user) => {
                sqlx::query_as::<_, QueryCount>(
                    r#"
                    SELECT final_query AS query, COUNT(*) AS count
                    FROM search_queries
                    WHERE completed = 1 AND final_query IS NOT NULL AND user_identifier = ?
                    GROUP BY final_query
                    ORDER BY count DESC
                    LIMIT ?
                    "#,
                )
                .bind(user)
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, QueryCount>(
                    r#"
                    SELECT final_query AS query, COUNT(*) AS count
                    FROM search_queries
                    WHERE completed = 1 AND final_query IS NOT NULL
                    GROUP BY final_query
                    ORDER BY count DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(rows)
    }

    async fn suggestions(&self, term: &str, limit: i64) -> Result<Vec<String>, StoreError> {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));

        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT final_query FROM search_queries
            WHERE completed = 1 AND final_query IS NOT NULL
              AND LOWER(final_query) LIKE ? ESCAPE '\'
            GROUP BY final_query
            ORDER BY COUNT(*) DESC
            LIMIT ?
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn popular(&self, limit: i64) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT final_query FROM search_queries
            WHERE completed = 1 AND final_query IS NOT NULL
            GROUP BY final_query
            ORDER BY COUNT(*) DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn list_recent(
        &self,
        offset: i64,
        limit: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SearchQuery>, StoreError> {
        let rows = sqlx::query_as::<_, SearchQuery>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM search_queries
            WHERE created_at >= COALESCE(?, created_at)
              AND created_at <= COALESCE(?, created_at)
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(start.map(|t| t.to_rfc3339()))
        .bind(end.map(|t| t.to_rfc3339()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn count_all(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM search_queries
            WHERE created_at >= COALESCE(?, created_at)
              AND created_at <= COALESCE(?, created_at)
            "#,
        )
        .bind(start.map(|t| t.to_rfc3339()))
        .bind(end.map(|t| t.to_rfc3339()))
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    async fn top_queries_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QueryCount>, StoreError> {
        let rows = sqlx::query_as::<_, QueryCount>(
            r#"
            SELECT query, COUNT(*) AS count
            FROM search_queries
            WHERE created_at >= ?
            GROUP BY query
            ORDER BY count DESC
            LIMIT ?
            "#,
        )
        .bind(since.to_rfc3339())
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}
