//! Query frequency aggregation / 查询频次统计
//!
//! Store failures degrade to an empty result set; analytics are never worth
//! failing a request over.

use crate::models::QueryCount;

use super::store::QueryStore;

/// Most frequent canonical queries for one user / 单用户高频查询
pub async fn user_stats(store: &dyn QueryStore, user_key: &str, limit: i64) -> Vec<QueryCount> {
    if user_key.trim().is_empty() {
        return Vec::new();
    }

    match store.grouped_counts(Some(user_key), limit).await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!("Failed to get stats for user {}: {}", user_key, e);
            Vec::new()
        }
    }
}

/// Most frequent canonical queries across all users / 全局高频查询
pub async fn global_stats(store: &dyn QueryStore, limit: i64) -> Vec<QueryCount> {
    match store.grouped_counts(None, limit).await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!("Failed to get global stats: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::store::tests::memory_store;
    use crate::search::store::QueryStore;

    #[tokio::test]
    async fn test_user_stats_scoped_and_ordered() {
        let store = memory_store().await;
        for _ in 0..2 {
            let record = store.insert("ruby", "user1").await.unwrap();
            store.mark_completed(&record.id, "ruby").await.unwrap();
        }
        let record = store.insert("rails", "user1").await.unwrap();
        store.mark_completed(&record.id, "rails").await.unwrap();
        let foreign = store.insert("javascript", "user2").await.unwrap();
        store
            .mark_completed(&foreign.id, "javascript")
            .await
            .unwrap();

        let stats = user_stats(&store, "user1", 20).await;
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].query, "ruby");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[1].query, "rails");

        let limited = user_stats(&store, "user1", 1).await;
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_user_stats_blank_key_is_empty() {
        let store = memory_store().await;
        assert!(user_stats(&store, "  ", 20).await.is_empty());
    }

    #[tokio::test]
    async fn test_global_stats_counts_across_users() {
        let store = memory_store().await;
        for user in ["user1", "user2", "user3"] {
            let record = store.insert("ruby", user).await.unwrap();
            store.mark_completed(&record.id, "ruby").await.unwrap();
        }
        let record = store.insert("rails", "user1").await.unwrap();
        store.mark_completed(&record.id, "rails").await.unwrap();

        let stats = global_stats(&store, 100).await;
        assert_eq!(stats[0].query, "ruby");
        assert_eq!(stats[0].count, 3);
        assert_eq!(stats[1].query, "rails");
        assert_eq!(stats[1].count, 1);
    }

    #[tokio::test]
    async fn test_incomplete_records_do_not_count() {
        let store = memory_store().await;
        store.insert("ruby on ra", "user1").await.unwrap();

        assert!(global_stats(&store, 10).await.is_empty());
    }
}
