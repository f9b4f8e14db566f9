//! Query session tracker / 查询会话跟踪
//!
//! Folds successive keystroke-driven submissions from one user into a single
//! evolving record instead of creating noise: a new submission that extends
//! or shortens a recent in-progress query updates that record in place.

use chrono::{Duration, Utc};

use crate::models::SearchQuery;
use crate::utils::truncate_chars;

use super::store::{QueryStore, StoreError};
use super::{MAX_QUERY_LENGTH, RECENCY_WINDOW_MINUTES};

/// Track a partial query submission with the default recency window.
///
/// Returns `Ok(None)` when text or user key is blank after trimming; the
/// submission is a no-op in that case.
pub async fn track_query(
    store: &dyn QueryStore,
    text: &str,
    user_key: &str,
) -> Result<Option<SearchQuery>, StoreError> {
    track_query_with_window(store, text, user_key, RECENCY_WINDOW_MINUTES).await
}

/// Track a partial query submission against a caller-chosen window.
///
/// The read-then-write here is not serialized per user; two simultaneous
/// submissions from the same key can both miss the match and create
/// duplicate in-progress records. Accepted tradeoff, see DESIGN.md.
pub async fn track_query_with_window(
    store: &dyn QueryStore,
    text: &str,
    user_key: &str,
    window_minutes: i64,
) -> Result<Option<SearchQuery>, StoreError> {
    let text = text.trim();
    let user_key = user_key.trim();
    if text.is_empty() || user_key.is_empty() {
        return Ok(None);
    }

    let text = truncate_chars(text, MAX_QUERY_LENGTH);
    let since = Utc::now() - Duration::minutes(window_minutes);

    match store.find_recent_in_progress(user_key, &text, since).await {
        Ok(Some(existing)) => match store.update_text(&existing.id, &text).await {
            Ok(()) => Ok(Some(SearchQuery {
                query: text,
                ..existing
            })),
            Err(e) => {
                // Never drop a submission while a write path still works
                tracing::warn!(
                    "Failed to extend in-progress query {}, creating a new record: {}",
                    existing.id,
                    e
                );
                Ok(Some(store.insert(&text, user_key).await?))
            }
        },
        Ok(None) => Ok(Some(store.insert(&text, user_key).await?)),
        Err(e) => {
            tracing::warn!(
                "Error matching in-progress query for user {}, creating a new record: {}",
                user_key,
                e
            );
            Ok(Some(store.insert(&text, user_key).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::store::tests::{backdate, memory_store};
    use crate::search::store::SqliteQueryStore;
    use async_trait::async_trait;
    use chrono::DateTime;
    use crate::models::QueryCount;

    #[tokio::test]
    async fn test_blank_input_is_a_noop() {
        let store = memory_store().await;
        assert!(track_query(&store, "   ", "user1").await.unwrap().is_none());
        assert!(track_query(&store, "rails", " ").await.unwrap().is_none());
        assert_eq!(store.count_all(None, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_continuation_updates_the_same_record() {
        let store = memory_store().await;
        let first = track_query(&store, "how to", "user1")
            .await
            .unwrap()
            .unwrap();
        let second = track_query(&store, "how to use rails", "user1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.query, "how to use rails");
        assert_eq!(store.count_all(None, None).await.unwrap(), 1);

        let stored = store.get(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.query, "how to use rails");
        assert!(!stored.completed);
    }

    #[tokio::test]
    async fn test_unrelated_phrase_creates_a_new_record() {
        let store = memory_store().await;
        let first = track_query(&store, "how to use rails", "user1")
            .await
            .unwrap()
            .unwrap();
        let second = track_query(&store, "completely different topic", "user1")
            .await
            .unwrap()
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.count_all(None, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stale_session_is_not_continued() {
        let store = memory_store().await;
        let stale = track_query(&store, "how to", "user1")
            .await
            .unwrap()
            .unwrap();
        backdate(&store, &stale.id, 45).await;

        let fresh = track_query(&store, "how to use rails", "user1")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stale.id, fresh.id);
    }

    #[tokio::test]
    async fn test_long_submission_is_truncated() {
        let store = memory_store().await;
        let long = "q".repeat(500);
        let record = track_query(&store, &long, "user1").await.unwrap().unwrap();
        assert_eq!(record.query.chars().count(), 255);
    }

    /// Store whose read path always fails; writes delegate to a real store.
    struct BrokenReadStore {
        inner: SqliteQueryStore,
    }

    #[async_trait]
    impl QueryStore for BrokenReadStore {
        async fn find_recent_in_progress(
            &self,
            _user_key: &str,
            _text: &str,
            _since: DateTime<Utc>,
        ) -> Result<Option<SearchQuery>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn get(&self, id: &str) -> Result<Option<SearchQuery>, StoreError> {
            self.inner.get(id).await
        }

        async fn insert(&self, text: &str, user_key: &str) -> Result<SearchQuery, StoreError> {
            self.inner.insert(text, user_key).await
        }

        async fn update_text(&self, id: &str, text: &str) -> Result<(), StoreError> {
            self.inner.update_text(id, text).await
        }

        async fn mark_completed(&self, id: &str, final_text: &str) -> Result<(), StoreError> {
            self.inner.mark_completed(id, final_text).await
        }

        async fn delete_incomplete_related(
            &self,
            user_key: &str,
            final_text: &str,
            keep_id: Option<&str>,
        ) -> Result<u64, StoreError> {
            self.inner
                .delete_incomplete_related(user_key, final_text, keep_id)
                .await
        }

        async fn merge_similar_completed(
            &self,
            user_key: &str,
            final_text: &str,
        ) -> Result<u64, StoreError> {
            self.inner.merge_similar_completed(user_key, final_text).await
        }

        async fn grouped_counts(
            &self,
            user_key: Option<&str>,
            limit: i64,
        ) -> Result<Vec<QueryCount>, StoreError> {
            self.inner.grouped_counts(user_key, limit).await
        }

        async fn suggestions(&self, term: &str, limit: i64) -> Result<Vec<String>, StoreError> {
            self.inner.suggestions(term, limit).await
        }

        async fn popular(&self, limit: i64) -> Result<Vec<String>, StoreError> {
            self.inner.popular(limit).await
        }

        async fn list_recent(
            &self,
            offset: i64,
            limit: i64,
            start: Option<DateTime<Utc>>,
            end: Option<DateTime<Utc>>,
        ) -> Result<Vec<SearchQuery>, StoreError> {
            self.inner.list_recent(offset, limit, start, end).await
        }

        async fn count_all(
            &self,
            start: Option<DateTime<Utc>>,
            end: Option<DateTime<Utc>>,
        ) -> Result<i64, StoreError> {
            self.inner.count_all(start, end).await
        }

        async fn top_queries_since(
            &self,
            since: DateTime<Utc>,
            limit: i64,
        ) -> Result<Vec<QueryCount>, StoreError> {
            self.inner.top_queries_since(since, limit).await
        }
    }

    #[tokio::test]
    async fn test_read_failure_degrades_to_insert() {
        let store = BrokenReadStore {
            inner: memory_store().await,
        };

        let record = track_query(&store, "how to use rails", "user1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.query, "how to use rails");
        assert_eq!(store.inner.count_all(None, None).await.unwrap(), 1);
    }
}
