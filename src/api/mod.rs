pub mod analytics;
pub mod insights;
pub mod search;
pub mod server;
pub mod suggestions;

use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            code: 400,
            message: message.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::state::AppState;
    use querytrail_backend::search::SqliteQueryStore;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::net::SocketAddr;
    use std::sync::Arc;

    /// Handler tests run against an in-memory database. One connection only:
    /// every pooled connection to sqlite::memory: would otherwise see its own
    /// database.
    pub(crate) async fn memory_state() -> Arc<AppState> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("connect in-memory sqlite");
        let store = SqliteQueryStore::new(pool);
        store.init().await.expect("init schema");
        Arc::new(AppState { store })
    }

    /// Stand-in peer address for handlers that derive the user key from it.
    pub(crate) fn peer() -> SocketAddr {
        "192.168.1.1:4000".parse().unwrap()
    }
}
