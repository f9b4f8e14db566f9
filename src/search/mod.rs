//! Search intent tracking / 搜索意图跟踪
//!
//! Turns a stream of partial keystroke submissions into clean analytics:
//! - completeness: does the text read as a finished search? / 完整性判断
//! - tracking: fold successive partials into one session record / 会话跟踪
//! - finalization: mark done and consolidate near-duplicates / 收尾与归并
//! - stats: frequency aggregation over canonical queries / 频次统计

pub mod completeness;
pub mod finalize;
pub mod stats;
pub mod store;
pub mod tracker;

pub use completeness::{analyze, appears_complete, CompletenessAnalysis};
pub use store::{QueryStore, SqliteQueryStore, StoreError};

/// How far back a partial submission still counts as the same session / 回溯窗口
pub const RECENCY_WINDOW_MINUTES: i64 = 30;

/// Queries longer than this are truncated before storage, never rejected / 最大查询长度
pub const MAX_QUERY_LENGTH: usize = 255;
