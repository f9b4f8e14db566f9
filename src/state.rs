use querytrail_backend::search::SqliteQueryStore;

/// Shared application state / 共享应用状态
pub struct AppState {
    pub store: SqliteQueryStore,
}
