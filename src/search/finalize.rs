//! Finalization and consolidation / 收尾与归并
//!
//! Marking a record completed also tidies the user's history: obsolete
//! partial states of the same session are deleted, and previously completed
//! prefix variants are rewritten to the new canonical text so "ruby" and
//! "ruby on rails" land in one analytics bucket.

use crate::models::SearchQuery;

use super::store::QueryStore;

/// Finish a query session. `final_text` defaults to the record's current
/// text when absent or blank.
///
/// Cleanup runs first but is best-effort: its errors are logged and
/// swallowed, and the completion update is attempted regardless. The return
/// value reflects only whether the record itself was updated.
pub async fn finish(
    store: &dyn QueryStore,
    record: &SearchQuery,
    final_text: Option<&str>,
) -> bool {
    let final_text = match final_text {
        Some(text) if !text.trim().is_empty() => text.trim(),
        _ => record.query.as_str(),
    };

    cleanup_related(store, &record.user_identifier, final_text, Some(&record.id)).await;

    match store.mark_completed(&record.id, final_text).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Failed to finish search {}: {}", record.id, e);
            false
        }
    }
}

/// Delete subsumed partials and merge prefix-related completed records into
/// the canonical final text / 删除过时部分记录并归并相似查询
pub async fn cleanup_related(
    store: &dyn QueryStore,
    user_key: &str,
    final_text: &str,
    keep_id: Option<&str>,
) {
    if user_key.trim().is_empty() || final_text.trim().is_empty() {
        return;
    }

    match store
        .delete_incomplete_related(user_key, final_text, keep_id)
        .await
    {
        Ok(count) if count > 0 => {
            tracing::info!("Cleaned up {} partial queries for user {}", count, user_key);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("Error deleting partial queries for user {}: {}", user_key, e);
        }
    }

    match store.merge_similar_completed(user_key, final_text).await {
        Ok(count) if count > 0 => {
            tracing::info!("Merged {} similar queries into '{}'", count, final_text);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("Error merging similar queries for user {}: {}", user_key, e);
        }
    }
}
